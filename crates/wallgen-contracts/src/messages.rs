/// Display language for user-facing status messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Ko,
}

impl Locale {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Some(Self::En),
            "ko" | "ko-kr" | "korean" => Some(Self::Ko),
            _ => None,
        }
    }

    /// Shown when a batch settles with zero images.
    pub fn batch_empty(self) -> &'static str {
        match self {
            Self::En => "Couldn't generate any wallpapers. Please try again.",
            Self::Ko => "이미지를 생성하지 못했습니다. 다시 시도해주세요.",
        }
    }

    /// Shown for any other failure reaching the controller.
    pub fn generic_failure(self) -> &'static str {
        match self {
            Self::En => "Something went wrong. Please try again in a moment.",
            Self::Ko => "오류가 발생했습니다. 잠시 후 다시 시도해주세요.",
        }
    }

    pub fn generating(self) -> &'static str {
        match self {
            Self::En => "Generating wallpapers...",
            Self::Ko => "이미지 생성 중...",
        }
    }

    pub fn credential_required(self) -> &'static str {
        match self {
            Self::En => "An API key is required. Use /connect to add one.",
            Self::Ko => "API 키가 필요합니다. /connect 로 연결해주세요.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Locale;

    #[test]
    fn parse_locale_aliases() {
        assert_eq!(Locale::parse("KO"), Some(Locale::Ko));
        assert_eq!(Locale::parse("en-US"), Some(Locale::En));
        assert_eq!(Locale::parse("fr"), None);
    }

    #[test]
    fn messages_differ_per_failure_kind() {
        for locale in [Locale::En, Locale::Ko] {
            assert_ne!(locale.batch_empty(), locale.generic_failure());
        }
        assert_eq!(
            Locale::Ko.batch_empty(),
            "이미지를 생성하지 못했습니다. 다시 시도해주세요."
        );
    }
}
