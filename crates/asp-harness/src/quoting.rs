//! POSIX-safe quoting for dry-run command rendering (P10): the printed
//! string must re-parse to the original argv under POSIX shell rules.

const SAFE_BYTES: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_./-";

fn needs_quoting(arg: &str) -> bool {
    !arg.bytes().all(|b| SAFE_BYTES.as_bytes().contains(&b))
}

/// Single-quotes `arg` if it contains any character outside
/// `[A-Za-z0-9_./-]`; embedded single quotes are escaped by closing the
/// quote, emitting an escaped quote, and reopening (`'\''`).
pub fn posix_quote(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    if !needs_quoting(arg) {
        return arg.to_string();
    }
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('\'');
    for c in arg.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

pub fn render_command(program: &str, argv: &[String]) -> String {
    let mut parts = vec![posix_quote(program)];
    parts.extend(argv.iter().map(|a| posix_quote(a)));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_safe_argument_unquoted() {
        assert_eq!(posix_quote("--plugin-dir"), "--plugin-dir");
        assert_eq!(posix_quote("/home/user/space-1"), "/home/user/space-1");
    }

    #[test]
    fn quotes_argument_with_spaces() {
        assert_eq!(posix_quote("hello world"), "'hello world'");
    }

    #[test]
    fn escapes_embedded_single_quote() {
        assert_eq!(posix_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn empty_argument_renders_as_empty_quotes() {
        assert_eq!(posix_quote(""), "''");
    }

    #[test]
    fn render_command_round_trips_through_a_posix_shell_reader() {
        let argv = vec!["--model".to_string(), "it's fine".to_string(), "plain".to_string()];
        let rendered = render_command("claude", &argv);
        let reparsed = shell_words_lite(&rendered);
        assert_eq!(reparsed, vec!["claude".to_string(), "--model".to_string(), "it's fine".to_string(), "plain".to_string()]);
    }

    /// A minimal POSIX word splitter (single quotes + backslash escapes
    /// outside quotes), used only to verify `render_command`'s output
    /// re-parses correctly in tests.
    fn shell_words_lite(s: &str) -> Vec<String> {
        let mut words = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars().peekable();
        let mut in_word = false;
        while let Some(c) = chars.next() {
            match c {
                ' ' => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                '\'' => {
                    in_word = true;
                    for next in chars.by_ref() {
                        if next == '\'' {
                            break;
                        }
                        current.push(next);
                    }
                }
                '\\' => {
                    in_word = true;
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                other => {
                    in_word = true;
                    current.push(other);
                }
            }
        }
        if in_word {
            words.push(current);
        }
        words
    }
}
