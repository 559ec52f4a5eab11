// Copyright (c) 2024 Mike Tsao

//! Keyboard key names. Configuration refers to keys by the names SDL uses
//! (`a`, `space`, `f1`, `kp_enter`, ...), and the keyboard input source
//! reports the matching keycodes.

use crate::{error::ConfigError, traits::KeyNames};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

static INSTANCE: OnceCell<StandardKeys> = OnceCell::new();

/// The stock name table. Lookups ignore case.
#[derive(Debug)]
pub struct StandardKeys {
    names: Vec<(String, i32)>,
    by_name: FxHashMap<String, i32>,
    by_code: FxHashMap<i32, usize>,
}
impl Default for StandardKeys {
    fn default() -> Self {
        let mut r = Self {
            names: Vec::default(),
            by_name: FxHashMap::default(),
            by_code: FxHashMap::default(),
        };
        for (name, code) in [
            ("backspace", 8),
            ("tab", 9),
            ("clear", 12),
            ("return", 13),
            ("pause", 19),
            ("escape", 27),
            ("space", 32),
            ("exclaim", 33),
            ("quotedbl", 34),
            ("hash", 35),
            ("dollar", 36),
            ("ampersand", 38),
            ("quote", 39),
            ("leftparen", 40),
            ("rightparen", 41),
            ("asterisk", 42),
            ("plus", 43),
            ("comma", 44),
            ("minus", 45),
            ("period", 46),
            ("slash", 47),
            ("colon", 58),
            ("semicolon", 59),
            ("less", 60),
            ("equals", 61),
            ("greater", 62),
            ("question", 63),
            ("at", 64),
            ("leftbracket", 91),
            ("backslash", 92),
            ("rightbracket", 93),
            ("caret", 94),
            ("underscore", 95),
            ("backquote", 96),
            ("delete", 127),
            ("kp_period", 266),
            ("kp_divide", 267),
            ("kp_multiply", 268),
            ("kp_minus", 269),
            ("kp_plus", 270),
            ("kp_enter", 271),
            ("kp_equals", 272),
            ("up", 273),
            ("down", 274),
            ("right", 275),
            ("left", 276),
            ("insert", 277),
            ("home", 278),
            ("end", 279),
            ("pageup", 280),
            ("pagedown", 281),
            ("numlock", 300),
            ("capslock", 301),
            ("scrollock", 302),
            ("rshift", 303),
            ("lshift", 304),
            ("rctrl", 305),
            ("lctrl", 306),
            ("ralt", 307),
            ("lalt", 308),
        ] {
            r.push(name.to_string(), code);
        }
        for c in b'0'..=b'9' {
            r.push((c as char).to_string(), c as i32);
        }
        for c in b'a'..=b'z' {
            r.push((c as char).to_string(), c as i32);
        }
        for n in 0..=9 {
            r.push(format!("kp{n}"), 256 + n);
        }
        for n in 1..=15 {
            r.push(format!("f{n}"), 281 + n);
        }
        r
    }
}
impl StandardKeys {
    /// The shared table.
    pub fn global() -> &'static Self {
        INSTANCE.get_or_init(Self::default)
    }

    fn push(&mut self, name: String, code: i32) {
        self.by_name.insert(name.clone(), code);
        self.by_code.entry(code).or_insert(self.names.len());
        self.names.push((name, code));
    }
}
impl KeyNames for StandardKeys {
    fn keycode(&self, name: &str) -> Option<i32> {
        self.by_name.get(&name.trim().to_ascii_lowercase()).copied()
    }

    fn key_name(&self, keycode: i32) -> Option<&str> {
        self.by_code
            .get(&keycode)
            .and_then(|i| self.names.get(*i))
            .map(|(name, _)| name.as_str())
    }
}

/// Parses a comma-separated list of key names, such as `a,b,space`.
pub fn parse_key_list(keys: &dyn KeyNames, text: &str) -> Result<Vec<i32>, ConfigError> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            keys.keycode(name)
                .ok_or_else(|| ConfigError::MalformedToken(name.to_string()))
        })
        .collect()
}

/// The reverse of [parse_key_list()]. Keycodes without a name are written as
/// numbers.
pub fn format_key_list(keys: &dyn KeyNames, codes: &[i32]) -> String {
    codes
        .iter()
        .map(|code| match keys.key_name(*code) {
            Some(name) => name.to_string(),
            None => code.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_codes() {
        let k = StandardKeys::global();
        assert_eq!(k.keycode("a"), Some(97));
        assert_eq!(k.keycode("A"), Some(97));
        assert_eq!(k.keycode(" space "), Some(32));
        assert_eq!(k.keycode("f1"), Some(282));
        assert_eq!(k.keycode("f15"), Some(296));
        assert_eq!(k.keycode("kp0"), Some(256));
        assert_eq!(k.keycode("7"), Some(55));
        assert_eq!(k.keycode("VOL"), None);
        assert_eq!(k.key_name(276), Some("left"));
        assert_eq!(k.key_name(100_000), None);
    }

    #[test]
    fn key_lists() {
        let k = StandardKeys::global();
        let codes = parse_key_list(k, "a, b,space,").unwrap();
        assert_eq!(codes, vec![97, 98, 32]);
        assert_eq!(format_key_list(k, &codes), "a,b,space");
        assert_eq!(format_key_list(k, &[97, -1]), "a,-1");
        assert_eq!(
            parse_key_list(k, "a,nope"),
            Err(ConfigError::MalformedToken("nope".to_string()))
        );
    }
}
