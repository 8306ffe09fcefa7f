// Output contract of the state machine.
//
// A `Directive` says what to show the user without saying how. The LINE
// renderer in the application crate turns these into message objects; tests
// inspect them directly.

use rust_decimal::Decimal;

use crate::command;

/// Most index buttons offered when picking an entry to edit. Together with
/// the back button this fills a 13-item quick reply. Ledgers longer than
/// this still accept any valid number typed by hand.
pub const MAX_INDEX_CHOICES: usize = 12;

/// Values offered as one-tap replies after "enter numbers".
pub const COMMON_VALUES: &[&str] = &["0.5", "1.0", "1.5", "2.0", "3.0", "5.0"];

/// A suggested reply: the button label and the text sent when tapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub label: String,
    pub text: String,
}

impl Suggestion {
    fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Closed set of reply menus a text directive can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choices {
    None,
    /// Enter numbers / list / edit / finish / help.
    MainMenu,
    /// Common values plus back.
    CommonValues,
    /// Entry numbers `1..=min(count, MAX_INDEX_CHOICES)` plus back.
    EditIndex { count: usize },
    /// Modify / delete / back.
    EditAction,
    /// Confirm / cancel.
    Confirm,
}

impl Choices {
    /// Expand the menu into concrete suggestions, in display order.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        match *self {
            Choices::None => Vec::new(),
            Choices::MainMenu => vec![
                Suggestion::new("🔢 輸入支數", command::ENTER_NUMBERS),
                Suggestion::new("📋 列表", command::LIST),
                Suggestion::new("✏ 編輯", command::EDIT),
                Suggestion::new("🔚 結束", command::FINISH),
                Suggestion::new("ℹ️ 說明", command::HELP),
            ],
            Choices::CommonValues => {
                let mut items: Vec<Suggestion> =
                    COMMON_VALUES.iter().map(|v| Suggestion::new(*v, *v)).collect();
                items.push(back());
                items
            }
            Choices::EditIndex { count } => {
                let mut items: Vec<Suggestion> = (1..=count.min(MAX_INDEX_CHOICES))
                    .map(|n| Suggestion::new(format!("第{n}筆"), n.to_string()))
                    .collect();
                items.push(back());
                items
            }
            Choices::EditAction => vec![
                Suggestion::new("✏ 修改", command::MODIFY),
                Suggestion::new("🗑 刪除", command::DELETE),
                back(),
            ],
            Choices::Confirm => vec![
                Suggestion::new("✅ 確認", command::CONFIRM),
                Suggestion::new("❌ 取消", command::CANCEL),
            ],
        }
    }
}

fn back() -> Suggestion {
    Suggestion::new("⬅ 返回", command::BACK)
}

/// Why a ledger listing is being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingPurpose {
    /// Plain review via the list command.
    Review,
    /// Preview before confirming the calculation.
    Preview,
}

/// One instruction for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Text {
        text: String,
        choices: Choices,
    },
    Listing {
        entries: Vec<Decimal>,
        total: Decimal,
        purpose: ListingPurpose,
        choices: Choices,
    },
    ResultCard {
        name: String,
        total: Decimal,
        bonus: Decimal,
    },
}

impl Directive {
    pub fn text(text: impl Into<String>, choices: Choices) -> Self {
        Directive::Text {
            text: text.into(),
            choices,
        }
    }

    pub fn choices(&self) -> Choices {
        match self {
            Directive::Text { choices, .. } | Directive::Listing { choices, .. } => *choices,
            Directive::ResultCard { .. } => Choices::None,
        }
    }

    /// Plain-text rendering. Result cards fall back to a one-line summary,
    /// which is also what chat clients show as the card's alt text.
    pub fn render_text(&self) -> String {
        match self {
            Directive::Text { text, .. } => text.clone(),
            Directive::Listing {
                entries,
                total,
                purpose,
                ..
            } => {
                let body = format_listing(entries, *total);
                match purpose {
                    ListingPurpose::Review => body,
                    ListingPurpose::Preview => {
                        format!("📋【結束前預覽】\n\n{body}\n\n請確認是否要結束並計算獎金？")
                    }
                }
            }
            Directive::ResultCard { name, total, bonus } => {
                format!("姓名：{name}\n總支數：{total}\n獎金（×76）：{bonus} 元")
            }
        }
    }
}

/// `1) 1.0` lines followed by the total and the count.
pub fn format_listing(entries: &[Decimal], total: Decimal) -> String {
    let mut out = String::new();
    for (i, value) in entries.iter().enumerate() {
        out.push_str(&format!("{}) {}\n", i + 1, value));
    }
    out.push_str(&format!("\n合計：{}\n共 {} 筆", total, entries.len()));
    out
}
