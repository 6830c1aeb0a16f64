//! Text normalisation for loose matching of spreadsheet headers.

/// Lowercases, folds Turkish and French diacritics to ASCII and drops every
/// character that is not a letter or digit.
///
/// `"E-posta"` becomes `"eposta"`, `"Soyadı"` becomes `"soyadi"` and
/// `"Prénom"` becomes `"prenom"`.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        // Combining diacritical marks from decomposed input
        if ('\u{0300}'..='\u{036f}').contains(&c) {
            continue;
        }
        match fold_char(c) {
            Folded::One(f) => push_if_alnum(&mut out, f),
            Folded::Two(a, b) => {
                out.push(a);
                out.push(b);
            }
        }
    }
    out
}

enum Folded {
    One(char),
    Two(char, char),
}

fn fold_char(c: char) -> Folded {
    let folded = match c {
        'ı' | 'I' | 'İ' | 'i' | 'î' | 'Î' | 'ï' | 'Ï' | 'í' | 'Í' | 'ì' | 'Ì' => 'i',
        'ş' | 'Ş' => 's',
        'ğ' | 'Ğ' => 'g',
        'ç' | 'Ç' => 'c',
        'ö' | 'Ö' | 'ô' | 'Ô' | 'ó' | 'Ó' | 'ò' | 'Ò' => 'o',
        'ü' | 'Ü' | 'û' | 'Û' | 'ù' | 'Ù' | 'ú' | 'Ú' => 'u',
        'é' | 'É' | 'è' | 'È' | 'ê' | 'Ê' | 'ë' | 'Ë' => 'e',
        'à' | 'À' | 'â' | 'Â' | 'á' | 'Á' | 'ä' | 'Ä' => 'a',
        'ÿ' | 'Ÿ' => 'y',
        'œ' | 'Œ' => return Folded::Two('o', 'e'),
        'æ' | 'Æ' => return Folded::Two('a', 'e'),
        other => {
            let mut lower = other.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) => l,
                _ => other,
            }
        }
    };
    Folded::One(folded)
}

fn push_if_alnum(out: &mut String, c: char) {
    if c.is_ascii_alphanumeric() {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_punctuation_and_case() {
        assert_eq!(normalize_key("E-posta"), "eposta");
        assert_eq!(normalize_key("First Name"), "firstname");
        assert_eq!(normalize_key("  QR_Id "), "qrid");
    }

    #[test]
    fn test_folds_turkish_letters() {
        assert_eq!(normalize_key("Soyadı"), "soyadi");
        assert_eq!(normalize_key("İsim"), "isim");
        assert_eq!(normalize_key("Misafir Türü"), "misafirturu");
        assert_eq!(normalize_key("Adı"), "adi");
    }

    #[test]
    fn test_folds_french_letters() {
        assert_eq!(normalize_key("Prénom"), "prenom");
        assert_eq!(normalize_key("Courriel électronique"), "courrielelectronique");
        assert_eq!(normalize_key("Œuvre"), "oeuvre");
    }

    #[test]
    fn test_decomposed_marks_are_dropped() {
        assert_eq!(normalize_key("Pre\u{0301}nom"), "prenom");
    }

    #[test]
    fn test_non_latin_is_dropped() {
        assert_eq!(normalize_key("名前"), "");
    }
}
