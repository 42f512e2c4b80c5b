use thiserror::Error;

/// Outcomes that end a request early. Each maps to one user-facing message.
///
/// Upstream fetch failures are not in here: they degrade to absent data at the
/// fetch boundary and never abort a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("title translation failed")]
    TranslationFailed,
    #[error("aggregator search request failed")]
    SearchFailed,
    #[error("no game matched the query")]
    GameNotFound,
    #[error("no storefront link for the chosen game")]
    NoStoreLink,
    #[error("aggregator has no id for the app")]
    NoAggregatorId,
    #[error("input is not a storefront app link")]
    InvalidLink,
}

impl LookupError {
    pub fn user_message(self) -> &'static str {
        match self {
            LookupError::TranslationFailed => "游戏名翻译失败，请重试或直接输入Steam商店链接。",
            LookupError::SearchFailed => "游戏搜索失败，请重试或直接输入Steam商店链接。",
            LookupError::GameNotFound => "未找到该游戏，请检查名称或输入Steam商店链接。",
            LookupError::NoStoreLink => {
                "未找到该游戏的Steam商店链接，或链接格式异常。请尝试更换游戏名称或直接输入Steam商店链接。"
            }
            LookupError::NoAggregatorId => {
                "未找到该游戏的 isthereanydeal id \n（试一下换个名称搜索一下）。"
            }
            LookupError::InvalidLink => "请提供正确的Steam商店链接！",
        }
    }
}

/// Failures of the gallery search command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GalleryError {
    #[error("title translation failed")]
    TranslationFailed,
    #[error("aggregator search request failed")]
    SearchFailed,
    #[error("no results")]
    NothingFound,
}

impl GalleryError {
    pub fn user_message(self) -> &'static str {
        match self {
            GalleryError::TranslationFailed => "游戏名翻译失败，请重试。",
            GalleryError::SearchFailed => "查找游戏失败，请重试。",
            GalleryError::NothingFound => "未找到相关游戏。",
        }
    }
}
