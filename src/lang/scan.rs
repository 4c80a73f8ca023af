/// ## Word tokenizer
///
/// Splits program text into Forth words. A word is a maximal run of
/// letters/underscore, or of digits/decimal point; any other visible
/// character stands alone as a one-character word. A change of character
/// class ends a word just like whitespace does, so `2SIN` scans as `2`
/// then `SIN` and `::` scans as two colons.
pub fn scan(source: &str) -> Tokens<'_> {
    Tokens {
        chars: source.chars().peekable(),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Class {
    Letter,
    Digit,
    Other,
}

fn class_of(c: char) -> Class {
    if c.is_alphabetic() || c == '_' {
        Class::Letter
    } else if c.is_ascii_digit() || c == '.' {
        Class::Digit
    } else {
        Class::Other
    }
}

pub struct Tokens<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(pk) = self.chars.peek() {
            if pk.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
        let first = self.chars.next()?;
        let mut word = String::new();
        word.push(first);
        let class = class_of(first);
        if class == Class::Other {
            return Some(word);
        }
        while let Some(pk) = self.chars.peek() {
            if pk.is_whitespace() || class_of(*pk) != class {
                break;
            }
            word.push(*pk);
            self.chars.next();
        }
        Some(word)
    }
}
