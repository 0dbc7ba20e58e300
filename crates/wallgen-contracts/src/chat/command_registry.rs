#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands taking a 1-based gallery position.
pub(crate) const INDEX_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "view",
        action: "select_image",
    },
    CommandSpec {
        command: "remix",
        action: "remix",
    },
];

/// Commands taking a gallery position followed by an optional path.
pub(crate) const INDEX_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "save",
        action: "save_image",
    },
    CommandSpec {
        command: "download",
        action: "save_image",
    },
];

pub(crate) const OPTIONAL_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "export",
    action: "export_gallery",
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "close",
        action: "close_viewer",
    },
    CommandSpec {
        command: "gallery",
        action: "show_gallery",
    },
    CommandSpec {
        command: "status",
        action: "show_status",
    },
    CommandSpec {
        command: "connect",
        action: "connect_credential",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/view N",
    "/close",
    "/remix [N]",
    "/save [N] [PATH]",
    "/gallery",
    "/status",
    "/connect",
    "/export [PATH]",
    "/help",
    "/quit",
];
