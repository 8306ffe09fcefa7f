// Reserved-word classification for inbound chat text.
//
// Every message is reduced to a `Token` before dispatch. Matching is exact
// and case-sensitive after trimming surrounding whitespace.

/// Help / usage text.
pub const HELP: &str = "說明";
/// Restart the flow from the name step.
pub const RESTART: &str = "開始";
/// Alias for [`RESTART`].
pub const HOME: &str = "首頁";
pub const BACK: &str = "返回";
pub const ENTER_NUMBERS: &str = "輸入支數";
pub const LIST: &str = "列表";
pub const EDIT: &str = "編輯";
pub const FINISH: &str = "結束";
pub const DELETE: &str = "刪除";
pub const MODIFY: &str = "修改";
pub const CONFIRM: &str = "確認";
pub const CANCEL: &str = "取消";

/// A classified message: either one of the reserved commands or free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Help,
    Restart,
    Back,
    EnterNumbers,
    List,
    Edit,
    Finish,
    Delete,
    Modify,
    Confirm,
    Cancel,
    /// Anything that is not a reserved word (a name, a number, or noise).
    /// Holds the trimmed text.
    Text(&'a str),
}

impl<'a> Token<'a> {
    /// Classify raw user text.
    pub fn classify(raw: &'a str) -> Self {
        let text = raw.trim();
        match text {
            HELP => Token::Help,
            RESTART | HOME => Token::Restart,
            BACK => Token::Back,
            ENTER_NUMBERS => Token::EnterNumbers,
            LIST => Token::List,
            EDIT => Token::Edit,
            FINISH => Token::Finish,
            DELETE => Token::Delete,
            MODIFY => Token::Modify,
            CONFIRM => Token::Confirm,
            CANCEL => Token::Cancel,
            other => Token::Text(other),
        }
    }
}
