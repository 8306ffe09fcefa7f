// Session state machine: one user message in, next session + directives out.
//
// Dispatch order (first match wins):
//   help -> restart -> edit mode -> confirm mode -> name step
//   -> back -> enter numbers -> list -> edit -> finish -> number entry
//
// Several branches overlap on input (e.g. "返回" means different things in
// edit mode and in normal mode), so the order is load-bearing.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::command::{self, Token};
use crate::directive::{Choices, Directive, ListingPurpose};
use crate::ledger::{normalize_checked, parse_amount, Ledger};
use crate::session::{EditStep, Mode, Session, Stage};

/// Bonus paid per unit of total.
pub const BONUS_RATE: i64 = 76;

pub const HELP_TEXT: &str = "【獎金計算機 - 使用說明】\n\n\
    1️⃣ 先輸入姓名\n\
    2️⃣ 使用「輸入支數」輸入每一筆支數\n\
    3️⃣ 可使用「列表 / 編輯」檢視與調整\n\
    4️⃣ 使用「結束」進行預覽與計算獎金\n\n\
    獎金公式：總支數 × 76";

pub const NAME_PROMPT: &str = "🟦 步驟 1：請輸入姓名";

const TOO_LARGE_TEXT: &str = "數值過大，無法計算合計與獎金。\n請輸入較小的數值，或使用「編輯」調整資料。";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Input the user can correct. Always answered with a guidance message,
/// never surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is blank")]
    BlankName,
    #[error("`{0}` is a reserved command and cannot be a name")]
    ReservedName(String),
    #[error("`{0}` is not a valid number")]
    MalformedNumber(String),
    #[error("`{input}` is not an entry number in 1..={count}")]
    IndexOutOfRange { input: String, count: usize },
    #[error("total or bonus is too large to compute")]
    TooLarge,
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub session: Session,
    pub directives: Vec<Directive>,
}

/// Bonus for a given total, at one decimal.
pub fn bonus_for(total: Decimal) -> Result<Decimal, ValidationError> {
    total
        .checked_mul(Decimal::from(BONUS_RATE))
        .and_then(normalize_checked)
        .ok_or(ValidationError::TooLarge)
}

/// Total and bonus of `ledger`. Every ledger a session keeps satisfies this,
/// since entries that would break it are refused on the way in.
fn totals(ledger: &Ledger) -> Result<(Decimal, Decimal), ValidationError> {
    let total = ledger.sum().map_err(|_| ValidationError::TooLarge)?;
    Ok((total, bonus_for(total)?))
}

/// Apply `change` to a copy of the ledger and keep it only if the totals
/// still compute.
fn commit<T>(
    ledger: &mut Ledger,
    change: impl FnOnce(&mut Ledger) -> Result<T, ValidationError>,
) -> Result<T, ValidationError> {
    let mut next = ledger.clone();
    let out = change(&mut next)?;
    totals(&next)?;
    *ledger = next;
    Ok(out)
}

fn too_large(err: ValidationError) -> Directive {
    warn!("totals rejected: {err}");
    Directive::text(TOO_LARGE_TEXT, Choices::MainMenu)
}

/// Handle one inbound message against `session`.
///
/// Pure: the only effects are on the returned session. A confirmed
/// calculation and the restart command both return a default session.
pub fn handle(mut session: Session, raw_text: &str) -> Transition {
    let token = Token::classify(raw_text);
    let text = raw_text.trim();
    let before = (session.primary_state(), session.mode());

    let directives = dispatch(&mut session, token, text);

    let after = (session.primary_state(), session.mode());
    if before != after {
        debug!(from = ?before, to = ?after, "session transition");
    }

    Transition {
        session,
        directives,
    }
}

fn dispatch(session: &mut Session, token: Token<'_>, text: &str) -> Vec<Directive> {
    match token {
        Token::Help => return vec![Directive::text(HELP_TEXT, Choices::MainMenu)],
        Token::Restart => {
            *session = Session::default();
            return vec![Directive::text(NAME_PROMPT, Choices::None)];
        }
        _ => {}
    }

    let (name, mode) = match (session.name(), session.mode()) {
        (Some(name), Some(mode)) => (name.to_string(), mode),
        _ => return vec![handle_name(session, token, text)],
    };

    match mode {
        Mode::Editing(step) => vec![handle_edit(session, step, token, text)],
        Mode::Confirming => handle_confirm(session, &name, token),
        Mode::Normal => vec![handle_normal(session, &name, token, text)],
    }
}

// ---------------------------------------------------------------------------
// Name step
// ---------------------------------------------------------------------------

fn validate_name(token: Token<'_>, text: &str) -> Result<String, ValidationError> {
    match token {
        Token::Text("") => Err(ValidationError::BlankName),
        Token::Text(name) => Ok(name.to_string()),
        _ => Err(ValidationError::ReservedName(text.to_string())),
    }
}

fn handle_name(session: &mut Session, token: Token<'_>, text: &str) -> Directive {
    match validate_name(token, text) {
        Ok(name) => {
            let reply = format!("👤 姓名：{name}\n\n請使用下方按鈕開始輸入支數。");
            session.stage = Stage::Active {
                name,
                mode: Mode::Normal,
            };
            session.ledger = Default::default();
            Directive::text(reply, Choices::MainMenu)
        }
        Err(ValidationError::BlankName) => {
            Directive::text("姓名不可為空白，請重新輸入。", Choices::None)
        }
        Err(e) => {
            debug!("rejected name: {e}");
            Directive::text(
                "現在是【輸入姓名】階段，請輸入姓名（不能使用指令）。",
                Choices::None,
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(session: &mut Session, name: &str, token: Token<'_>, text: &str) -> Directive {
    let ledger = &mut session.ledger;
    match token {
        Token::Back => match totals(ledger) {
            Ok((total, _)) => Directive::text(
                format!(
                    "👤 姓名：{name}\n目前筆數：{} 筆，合計 {total}\n\n請使用下方按鈕繼續操作。",
                    ledger.count(),
                ),
                Choices::MainMenu,
            ),
            Err(e) => too_large(e),
        },
        Token::EnterNumbers => Directive::text(
            "請輸入支數（可含小數），\n也可以直接點下方常用數值按鈕。",
            Choices::CommonValues,
        ),
        Token::List => {
            if ledger.is_empty() {
                return Directive::text("📋 尚未輸入任何支數。", Choices::MainMenu);
            }
            match totals(ledger) {
                Ok((total, _)) => Directive::Listing {
                    entries: ledger.entries(),
                    total,
                    purpose: ListingPurpose::Review,
                    choices: Choices::MainMenu,
                },
                Err(e) => too_large(e),
            }
        }
        Token::Edit => {
            if ledger.is_empty() {
                return Directive::text("目前沒有資料可編輯。", Choices::MainMenu);
            }
            let count = ledger.count();
            session.set_mode(Mode::Editing(EditStep::SelectingIndex));
            Directive::text("請選擇要編輯的筆數：", Choices::EditIndex { count })
        }
        Token::Finish => {
            if ledger.is_empty() {
                return Directive::text("目前沒有資料可結束。", Choices::MainMenu);
            }
            let total = match totals(ledger) {
                Ok((total, _)) => total,
                Err(e) => return too_large(e),
            };
            let preview = Directive::Listing {
                entries: ledger.entries(),
                total,
                purpose: ListingPurpose::Preview,
                choices: Choices::Confirm,
            };
            session.set_mode(Mode::Confirming);
            preview
        }
        // Everything else, including edit/confirm words used out of
        // context, is a number candidate.
        _ => match parse_value(text) {
            Ok(value) => {
                let outcome = commit(ledger, |next| {
                    next.append(value).map_err(|_| ValidationError::TooLarge)
                });
                match outcome {
                    Ok(stored) => Directive::text(
                        format!("✔ 已加入：{stored}\n目前共有 {} 筆。", ledger.count()),
                        Choices::MainMenu,
                    ),
                    Err(e) => too_large(e),
                }
            }
            Err(e) => {
                debug!("number entry rejected: {e}");
                Directive::text(
                    "請輸入有效的數字（可含小數）。\n如需使用功能請按下方按鈕。",
                    Choices::MainMenu,
                )
            }
        },
    }
}

fn parse_value(text: &str) -> Result<Decimal, ValidationError> {
    parse_amount(text).ok_or_else(|| ValidationError::MalformedNumber(text.to_string()))
}

// ---------------------------------------------------------------------------
// Edit mode
// ---------------------------------------------------------------------------

/// Parse a 1-based entry number into a 0-based ledger index.
fn parse_selection(text: &str, count: usize) -> Result<usize, ValidationError> {
    let out_of_range = || ValidationError::IndexOutOfRange {
        input: text.to_string(),
        count,
    };
    let n: usize = text.parse().map_err(|_| out_of_range())?;
    if n == 0 || n > count {
        return Err(out_of_range());
    }
    Ok(n - 1)
}

fn exit_edit(session: &mut Session) {
    session.set_mode(Mode::Normal);
}

fn edit_state_broken(session: &mut Session, err: impl std::fmt::Display) -> Directive {
    warn!("edit target no longer valid: {err}");
    exit_edit(session);
    Directive::text(
        "編輯模式狀態異常，請輸入「開始」重新啟動流程。",
        Choices::MainMenu,
    )
}

fn handle_edit(session: &mut Session, step: EditStep, token: Token<'_>, text: &str) -> Directive {
    if token == Token::Back {
        exit_edit(session);
        return Directive::text("已退出編輯模式。", Choices::MainMenu);
    }

    let count = session.ledger.count();
    match step {
        EditStep::SelectingIndex => match parse_selection(text, count) {
            Ok(index) => {
                let Some(value) = session.ledger.get(index) else {
                    return edit_state_broken(session, format!("index {index} vanished"));
                };
                session.set_mode(Mode::Editing(EditStep::ChoosingAction { index }));
                Directive::text(
                    format!(
                        "你選擇第 {} 筆：{value}\n請選擇要「修改」或「刪除」。",
                        index + 1
                    ),
                    Choices::EditAction,
                )
            }
            Err(e) => {
                debug!("selection rejected: {e}");
                Directive::text(
                    format!("請使用下方按鈕選擇 1 ~ {count} 的編號。"),
                    Choices::EditIndex { count },
                )
            }
        },
        EditStep::ChoosingAction { index } => match token {
            Token::Delete => match session.ledger.remove_at(index) {
                Ok(removed) => {
                    exit_edit(session);
                    Directive::text(format!("✔ 已刪除：{removed}"), Choices::MainMenu)
                }
                Err(e) => edit_state_broken(session, e),
            },
            Token::Modify => {
                session.set_mode(Mode::Editing(EditStep::AwaitingNewValue { index }));
                Directive::text("請輸入新的數值（可含小數）：", Choices::None)
            }
            _ => Directive::text(
                format!(
                    "請使用下方按鈕選擇「{}」或「{}」。",
                    command::MODIFY,
                    command::DELETE
                ),
                Choices::EditAction,
            ),
        },
        EditStep::AwaitingNewValue { index } => match parse_value(text) {
            Ok(value) => {
                if session.ledger.get(index).is_none() {
                    return edit_state_broken(session, format!("index {index} vanished"));
                }
                let outcome = commit(&mut session.ledger, |next| {
                    next.update(index, value).map_err(|_| ValidationError::TooLarge)
                });
                match outcome {
                    Ok(stored) => {
                        exit_edit(session);
                        Directive::text(format!("✔ 已修改為：{stored}"), Choices::MainMenu)
                    }
                    Err(e) => {
                        debug!("replacement value rejected: {e}");
                        Directive::text("數值過大，請輸入較小的數值：", Choices::None)
                    }
                }
            }
            Err(e) => {
                debug!("replacement value rejected: {e}");
                Directive::text("請輸入有效數字。", Choices::None)
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Confirm mode
// ---------------------------------------------------------------------------

fn handle_confirm(session: &mut Session, name: &str, token: Token<'_>) -> Vec<Directive> {
    match token {
        Token::Cancel => {
            session.set_mode(Mode::Normal);
            vec![Directive::text(
                "已取消結束，可繼續輸入或編輯資料。",
                Choices::MainMenu,
            )]
        }
        Token::Confirm => {
            let (total, bonus) = match totals(&session.ledger) {
                Ok(pair) => pair,
                Err(e) => {
                    session.set_mode(Mode::Normal);
                    return vec![too_large(e)];
                }
            };
            debug!(%total, %bonus, entries = session.ledger.count(), "calculation confirmed");
            *session = Session::default();
            vec![
                Directive::ResultCard {
                    name: name.to_string(),
                    total,
                    bonus,
                },
                Directive::text(
                    format!("如要再算一次請輸入：{}", command::RESTART),
                    Choices::MainMenu,
                ),
            ]
        }
        _ => vec![Directive::text(
            format!(
                "請使用下方按鈕選擇「{}」或「{}」。",
                command::CONFIRM,
                command::CANCEL
            ),
            Choices::Confirm,
        )],
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
