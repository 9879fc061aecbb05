//! Function-call dialect
//!
//! `set(path, oldValue, newValue[, reason])`, optionally written `_.set(...)`.
//! The path must be quoted and the bare form takes no space before `(`, so
//! prose such as "the sun set (slowly)" is left alone. A trailing `;` is
//! swallowed, and a `// comment` on the same line supplies the reason when no
//! fourth argument is given.

use super::{line_end, CommandDialect};
use crate::command::{Extraction, MutationCommand};
use crate::error::CommandError;
use crate::literal::{coerce, unquote};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static CALL_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:_\.set\s*|\bset)(\()\s*['"`‘“]"#).expect("call head regex must compile")
});

/// `set(...)` instructions
#[derive(Debug, Clone, Copy, Default)]
pub struct CallDialect;

impl CallDialect {
    const NAME: &'static str = "call";
}

impl CommandDialect for CallDialect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn scan(&self, text: &str) -> Vec<Extraction> {
        let mut found = Vec::new();
        let mut resume = 0;
        for caps in CALL_HEAD.captures_iter(text) {
            let (Some(head), Some(paren)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if head.start() < resume {
                continue;
            }
            let extraction = parse_call(text, head.start(), paren.end());
            resume = extraction.span.end;
            found.push(extraction);
        }
        found
    }

    fn priority(&self) -> i32 {
        10
    }
}

fn parse_call(text: &str, start: usize, args_start: usize) -> Extraction {
    let Some((args, consumed)) = split_args(&text[args_start..]) else {
        return Extraction::malformed(
            start..line_end(text, start),
            CallDialect::NAME,
            CommandError::Unterminated(CallDialect::NAME),
        );
    };
    let mut end = args_start + consumed;

    // Swallow `;` and a same-line `// reason`
    let rest = &text[end..line_end(text, end)];
    let trimmed = rest.trim_start();
    let mut tail = trimmed;
    if let Some(after) = tail.strip_prefix(';') {
        end += rest.len() - trimmed.len() + 1;
        tail = after;
    }
    let comment = tail.trim_start().strip_prefix("//").map(|c| {
        end = line_end(text, end);
        c.trim().to_string()
    });

    let span = start..end;
    match build_command(&args, comment) {
        Ok(command) => Extraction::commands(span, CallDialect::NAME, vec![command]),
        Err(error) => Extraction::malformed(span, CallDialect::NAME, error),
    }
}

fn build_command(args: &[String], comment: Option<String>) -> Result<MutationCommand, CommandError> {
    let found = if args.len() == 1 && args[0].is_empty() {
        0
    } else {
        args.len()
    };
    if !(3..=4).contains(&found) {
        return Err(CommandError::ArgumentCount { found });
    }

    let path = unquote(&args[0]).unwrap_or_else(|| args[0].clone());
    let reason = match args.get(3).map(|r| coerce(r)) {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => comment,
        Some(other) => Some(other.to_string()),
    };

    MutationCommand::new(&path, Some(coerce(&args[1])), coerce(&args[2]), reason)
}

/// Split call arguments on top-level commas
///
/// `s` starts just after the opening parenthesis. Returns the trimmed
/// arguments and the number of bytes consumed including the closing `)`.
fn split_args(s: &str) -> Option<(Vec<String>, usize)> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;

    for (i, c) in s.char_indices() {
        if let Some(close) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == close {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '“' => quote = Some('”'),
            '‘' => quote = Some('’'),
            '(' | '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ')' if depth == 0 => {
                args.push(current.trim().to_string());
                return Some((args, i + c.len_utf8()));
            }
            ')' => depth -= 1,
            ',' if depth == 0 => {
                args.push(std::mem::take(&mut current).trim().to_string());
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SpanAction;
    use serde_json::json;

    fn scan_one(text: &str) -> Extraction {
        let mut found = CallDialect.scan(text);
        assert_eq!(found.len(), 1, "expected one extraction in {text:?}");
        found.remove(0)
    }

    #[test]
    fn four_argument_form() {
        let text = "She smiles. set('affinity', 3, 5, 'gift given') Done.";
        let e = scan_one(text);
        let cmd = &e.commands[0];
        assert_eq!(cmd.path, "affinity");
        assert_eq!(cmd.old_value, Some(json!(3)));
        assert_eq!(cmd.new_value, json!(5));
        assert_eq!(cmd.reason.as_deref(), Some("gift given"));
        assert_eq!(&text[e.span], "set('affinity', 3, 5, 'gift given')");
    }

    #[test]
    fn underscore_prefix_and_comment_reason() {
        let text = "_.set('world.time', 'morning', 'noon');//lunch arrives\nnext line";
        let e = scan_one(text);
        assert_eq!(e.commands[0].reason.as_deref(), Some("lunch arrives"));
        assert_eq!(&text[e.span.clone()], "_.set('world.time', 'morning', 'noon');//lunch arrives");
        assert_eq!(&text[e.span.end..], "\nnext line");
    }

    #[test]
    fn semicolon_swallowed_without_comment() {
        let text = "set('a', 1, 2);  tail";
        let e = scan_one(text);
        assert_eq!(&text[e.span], "set('a', 1, 2);");
    }

    #[test]
    fn commas_inside_values() {
        let e = scan_one(r#"set("party.names", ["a", "b"], ["a", "b", "c"], "joined, finally")"#);
        let cmd = &e.commands[0];
        assert_eq!(cmd.old_value, Some(json!(["a", "b"])));
        assert_eq!(cmd.new_value, json!(["a", "b", "c"]));
        assert_eq!(cmd.reason.as_deref(), Some("joined, finally"));
    }

    #[test]
    fn parens_inside_quotes() {
        let e = scan_one("set('note', '', 'a (small) thing')");
        assert_eq!(e.commands[0].new_value, json!("a (small) thing"));
    }

    #[test]
    fn wrong_argument_count_is_malformed() {
        let e = scan_one("set('a', 1)");
        assert!(e.commands.is_empty());
        assert_eq!(e.errors, vec![CommandError::ArgumentCount { found: 2 }]);
        assert_eq!(e.action, SpanAction::Keep);

        let e = scan_one("set('a')");
        assert_eq!(e.errors, vec![CommandError::ArgumentCount { found: 1 }]);
    }

    #[test]
    fn unterminated_call() {
        let e = scan_one("set('a', 1, 2\nmore text");
        assert_eq!(e.errors, vec![CommandError::Unterminated("call")]);
        assert_eq!(e.span, 0..13);
    }

    #[test]
    fn invalid_path_is_malformed() {
        let e = scan_one("set('a..b', 1, 2)");
        assert!(matches!(e.errors[0], CommandError::InvalidPath { .. }));
    }

    #[test]
    fn reset_is_not_a_call() {
        assert!(CallDialect.scan("reset('a', 1, 2)").is_empty());
    }

    #[test]
    fn prose_is_not_a_call() {
        for text in [
            "As the sun set (slowly, quietly, beautifully) she left.",
            "They set(out, early, today) at dawn.",
            "set ('a', 1, 2)",
            "set()",
        ] {
            assert!(CallDialect.scan(text).is_empty(), "matched {text:?}");
        }
    }

    #[test]
    fn spaced_underscore_form_and_curly_quotes() {
        let e = scan_one("_.set ( ‘mood’, ‘calm’, ‘it’s fine’ )");
        let cmd = &e.commands[0];
        assert_eq!(cmd.path, "mood");
        assert_eq!(cmd.old_value, Some(json!("calm")));
        assert_eq!(cmd.new_value, json!("it’s fine"));
    }

    #[test]
    fn multiple_calls() {
        let found = CallDialect.scan("set('a',0,1) and set('b',1,2)");
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].commands[0].path, "b");
    }
}
