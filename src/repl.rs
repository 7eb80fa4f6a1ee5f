use nu_ansi_term::{Color, Style};
use reedline::{
    Highlighter, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    StyledText, ValidationResult, Validator,
};
use std::borrow::Cow;

use crate::tokenizer::{tokenize, Keyword, Token};

#[derive(Clone)]
pub struct REPLPrompt;

impl Prompt for REPLPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed("esharp")
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        Cow::Borrowed(" ❯ ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("  ... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

/// Keeps reading lines while a string is open or a statement still lacks its `END`.
pub struct REPLValidator;

impl Validator for REPLValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if line.trim_end().is_empty() {
            return ValidationResult::Complete;
        }

        if has_open_string(line) {
            return ValidationResult::Incomplete;
        }

        let tokens = match tokenize(line.as_bytes()) {
            Ok(tokens) => tokens,
            // Let the interpreter report it
            Err(_) => return ValidationResult::Complete,
        };

        let (opened, closed) = tokens.iter().fold((0usize, 0usize), |(opened, closed), token| {
            match token {
                Token::Keyword(Keyword::End) => (opened, closed + 1),
                Token::Keyword(k) if k.opens_statement() => (opened + 1, closed),
                _ => (opened, closed),
            }
        });

        if opened > closed {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

fn has_open_string(line: &str) -> bool {
    let mut in_string = false;
    let mut in_comment = false;

    for c in line.chars() {
        match c {
            '\n' => in_comment = false,
            _ if in_comment => {}
            '"' => in_string = !in_string,
            '#' if !in_string => in_comment = true,
            _ => {}
        }
    }

    in_string
}

pub static KEYWORD_COLOR: Color = Color::LightBlue;
pub static LITERAL_COLOR: Color = Color::Yellow;
pub static IDENTIFIER_COLOR: Color = Color::LightGreen;
pub static DEFAULT_COLOR: Color = Color::White;

pub struct SyntaxHighlighter;

impl Highlighter for SyntaxHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled_text = StyledText::new();

        let tokens = match tokenize(line.as_bytes()) {
            Ok(t) => t,
            Err(_) => {
                styled_text.push((Style::new().fg(DEFAULT_COLOR), line.to_string()));
                return styled_text;
            }
        };

        let mut remaining = line;

        for token in tokens {
            let token_str = match &token {
                Token::String(s) => format!("\"{}\"", s),
                other => other.to_string(),
            };

            if let Some(pos) = remaining.find(&token_str) {
                if pos > 0 {
                    styled_text
                        .push((Style::new().fg(DEFAULT_COLOR), remaining[..pos].to_string()));
                }

                let color = match &token {
                    Token::Keyword(_) => KEYWORD_COLOR,
                    Token::String(_) | Token::Integer(_) => LITERAL_COLOR,
                    Token::Identifier(_) => IDENTIFIER_COLOR,
                };

                styled_text.push((Style::new().fg(color), token_str.clone()));
                remaining = &remaining[pos + token_str.len()..];
            }
        }

        if !remaining.is_empty() {
            styled_text.push((Style::new().fg(DEFAULT_COLOR), remaining.to_string()));
        }

        styled_text
    }
}
