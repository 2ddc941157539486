//! Environment variable loading.
//!
//! Keeps the fallback chains in one place so callers do not repeat `or_else` ladders.

use std::env;
use std::str::FromStr;

/// Load `.env` from the current directory into the environment (existing variables win).
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let path = env::current_dir()
            .map(|d| d.join(".env"))
            .unwrap_or_else(|_| std::path::PathBuf::from(".env"));
        if let Ok(content) = std::fs::read_to_string(&path) {
            for (key, value) in parse_dotenv(&content) {
                if env::var(key).is_err() {
                    env::set_var(key, value);
                }
            }
        }
    });
}

/// Parse `KEY=value` lines; blank lines and `#` comments are skipped, surrounding quotes stripped.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        // Strip inline comment (# not inside quotes)
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            pairs.push((key, value));
        }
    }
    pairs
}

fn lookup(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
}

/// Read the primary variable or the first set alias, falling back to `default`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    lookup(primary, aliases)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Read the primary variable or an alias; empty values count as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    lookup(primary, aliases).and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

/// 1/true/yes/on is true, 0/false/no/off is false.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Boolean variable. Unrecognised values keep the default.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    lookup(primary, aliases)
        .and_then(|s| parse_bool(&s))
        .unwrap_or(default)
}

/// Parse a variable with `FromStr`, logging and ignoring malformed values.
pub fn env_parse<T: FromStr>(primary: &str, aliases: &[&str]) -> Option<T> {
    let raw = env_optional(primary, aliases)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key = primary, value = %raw, "ignoring malformed environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_dotenv_strips_comments_and_quotes() {
        let content = "# header\n\nA=1\nB = \"two words\"\nC='x' \nD=value # trailing\nbroken line\n";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![("A", "1"), ("B", "two words"), ("C", "x"), ("D", "value")]
        );
    }

    #[test]
    fn test_env_lookup_uses_alias() {
        env::set_var("FORKRUN_TEST_ALIAS_ONLY", "7");
        let v: Option<i32> = env_parse("FORKRUN_TEST_PRIMARY_UNSET", &["FORKRUN_TEST_ALIAS_ONLY"]);
        assert_eq!(v, Some(7));
        assert_eq!(
            env_or("FORKRUN_TEST_PRIMARY_UNSET", &[], || "dflt".to_string()),
            "dflt"
        );
        env::remove_var("FORKRUN_TEST_ALIAS_ONLY");
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        env::set_var("FORKRUN_TEST_GARBAGE_NICE", "not-a-number");
        let v: Option<i32> = env_parse("FORKRUN_TEST_GARBAGE_NICE", &[]);
        assert_eq!(v, None);
        env::remove_var("FORKRUN_TEST_GARBAGE_NICE");
    }
}
