//! 文件名校验（扩展名白名单）与上传文件名清洗。

use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

/// 允许的扩展名集合，比较时忽略大小写。
#[derive(Clone, Debug)]
pub struct AllowList {
    extensions: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    /// 解析逗号分隔的扩展名列表。
    pub fn from_csv(value: &str) -> Self {
        Self::new(value.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// 文件名包含 `.` 且最后一个 `.` 之后的后缀在白名单中。
    pub fn is_allowed(&self, filename: &str) -> bool {
        filename
            .rsplit_once('.')
            .is_some_and(|(_, ext)| self.extensions.contains(&ext.to_lowercase()))
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(["wav"])
    }
}

/// 清洗客户端提供的文件名，使其只能落在存储目录内。
///
/// 先做 NFKD 分解并丢弃非 ASCII 字符（`café` → `cafe`），
/// 路径分隔符视为空白，空白折叠为 `_`，仅保留 `[A-Za-z0-9._-]`，
/// 并去掉首尾的 `.` 与 `_`。结果为空时返回 `None`。
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let separated: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = separated.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = filtered.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_checks_final_extension_case_insensitively() {
        let allow = AllowList::default();
        assert!(allow.is_allowed("a.wav"));
        assert!(allow.is_allowed("a.WAV"));
        assert!(allow.is_allowed("archive.tar.wav"));
        assert!(allow.is_allowed(".wav"));
        assert!(!allow.is_allowed("a"));
        assert!(!allow.is_allowed("a.mp3"));
        assert!(!allow.is_allowed("a.wav.mp3"));
        assert!(!allow.is_allowed("wav"));
        assert!(!allow.is_allowed(""));
    }

    #[test]
    fn allow_list_parses_configured_extensions() {
        let allow = AllowList::from_csv(" wav, .FLAC ,,");
        assert_eq!(allow.extensions().collect::<Vec<_>>(), vec!["flac", "wav"]);
        assert!(allow.is_allowed("song.flac"));
        assert!(!allow.is_allowed("song.ogg"));
        assert!(AllowList::from_csv(" , ").is_empty());
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(
            sanitize_filename("../../etc/passwd.wav").as_deref(),
            Some("etc_passwd.wav")
        );
        assert_eq!(
            sanitize_filename("/abs/path/take1.wav").as_deref(),
            Some("abs_path_take1.wav")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\a.wav").as_deref(),
            Some("C_Users_me_a.wav")
        );
    }

    #[test]
    fn sanitize_collapses_whitespace_and_drops_unsafe_chars() {
        assert_eq!(
            sanitize_filename("my  cool song.wav").as_deref(),
            Some("my_cool_song.wav")
        );
        assert_eq!(sanitize_filename("b\"a*d?.wav").as_deref(), Some("bad.wav"));
        assert_eq!(sanitize_filename("ok-name_1.wav").as_deref(), Some("ok-name_1.wav"));
    }

    #[test]
    fn sanitize_transliterates_non_ascii() {
        assert_eq!(sanitize_filename("café.wav").as_deref(), Some("cafe.wav"));
        assert_eq!(sanitize_filename("é.wav").as_deref(), Some("e.wav"));
        assert_eq!(sanitize_filename("ﬁnal mix.wav").as_deref(), Some("final_mix.wav"));
        assert_eq!(sanitize_filename("日本.wav").as_deref(), Some("wav"));
    }

    #[test]
    fn sanitize_rejects_names_with_nothing_left() {
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("/"), None);
        assert_eq!(sanitize_filename("   "), None);
        assert_eq!(sanitize_filename("..wav").as_deref(), Some("wav"));
    }
}
