//! Static Arabic lookup tables and the offline transliteration built on them.
//!
//! # Government lookup
//!
//! [`GOVERNMENTS`] is an ordered list, scanned front to back; the first entry
//! that occurs anywhere in the searched text wins. Order is significant: short
//! entries such as `"سعيد"` or `"شمال"` also occur in ordinary words and
//! names, so they can shadow a later, more specific entry. The order is kept
//! as the site data was originally labelled with it.

use crate::utils::title_case;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Arabic government name used when nothing in the table matches.
pub const UNKNOWN_GOVERNMENT_ARABIC: &str = "مفقود";
/// English counterpart of [`UNKNOWN_GOVERNMENT_ARABIC`].
pub const UNKNOWN_GOVERNMENT_ENGLISH: &str = "Null";

/// Per-letter Arabic to Latin substitutions.
const ARABIC_LETTERS: &[(char, &str)] = &[
    ('أ', "a"),
    ('ا', "a"),
    ('إ', "e"),
    ('ب', "b"),
    ('ت', "t"),
    ('ث', "th"),
    ('ج', "g"),
    ('ح', "h"),
    ('خ', "kh"),
    ('د', "d"),
    ('ذ', "th"),
    ('ر', "r"),
    ('ز', "z"),
    ('س', "s"),
    ('ش', "sh"),
    ('ص', "s"),
    ('ض', "d"),
    ('ط', "t"),
    ('ظ', "th"),
    ('ع', "a"),
    ('غ', "gh"),
    ('ف', "f"),
    ('ق', "q"),
    ('ك', "k"),
    ('ل', "l"),
    ('م', "m"),
    ('ن', "n"),
    ('ه', "h"),
    ('و', "ou"),
    ('ي', "i"),
    ('ى', "a"),
    ('ؤ', "ou"),
    ('ء', "aa"),
    ('ئ', "e"),
    ('ة', "h"),
];

static LETTER_MAP: Lazy<HashMap<char, &'static str>> =
    Lazy::new(|| ARABIC_LETTERS.iter().copied().collect());

/// Ordered government spellings and their English names. First match wins.
pub const GOVERNMENTS: &[(&str, &str)] = &[
    ("اسيوط", "Assiut"),
    ("أسيوط", "Assiut"),
    ("الجيزه", "Giza"),
    ("الجيزة", "Giza"),
    ("جيزة", "Giza"),
    ("جيزه", "Giza"),
    ("أسوان", "Aswan"),
    ("اسوان", "Aswan"),
    ("الاسكندرية", "Alexandria"),
    ("الاسكندريه", "Alexandria"),
    ("الإسكندرية", "Alexandria"),
    ("الإسكندريه", "Alexandria"),
    ("الأسكندرية", "Alexandria"),
    ("الأسكندريه", "Alexandria"),
    ("اسكندرية", "Alexandria"),
    ("اسكندريه", "Alexandria"),
    ("أسكندرية", "Alexandria"),
    ("أسكندريه", "Alexandria"),
    ("إسكندرية", "Alexandria"),
    ("إسكندريه", "Alexandria"),
    ("المنيا", "Minya"),
    ("منيا", "Minya"),
    ("القاهرة", "Cairo"),
    ("القاهره", "Cairo"),
    ("قاهرة", "Cairo"),
    ("قاهره", "Cairo"),
    ("الدقهلية", "Dakahlia"),
    ("الدقهليه", "Dakahlia"),
    ("دقهلية", "Dakahlia"),
    ("دقهليه", "Dakahlia"),
    ("سوهاج", "Sohag"),
    ("الغربية", "Gharbia"),
    ("الغربيه", "Gharbia"),
    ("غربية", "Gharbia"),
    ("غربيه", "Gharbia"),
    ("البحيرة", "Beheira"),
    ("البحيره", "Beheira"),
    ("بحيرة", "Beheira"),
    ("بحيره", "Beheira"),
    ("القليوبية", "Qualyubia"),
    ("القليوبيه", "Qualyubia"),
    ("قليوبية", "Qualyubia"),
    ("قليوبيه", "Qualyubia"),
    ("الشرقية", "Al-Sharqia"),
    ("الشرقيه", "Al-Sharqia"),
    ("شرقية", "Al-Sharqia"),
    ("شرقيه", "Al-Sharqia"),
    ("المنوفية", "Menofia"),
    ("المنوفيه", "Menofia"),
    ("منوفية", "Menofia"),
    ("منوفيه", "Menofia"),
    ("بني سويف", "Beni Suef"),
    ("بنى سويف", "Beni Suef"),
    ("سويف", "Beni Suef"),
    ("قنا", "Qena"),
    ("بور سعيد", "Port Said"),
    ("بور", "Port Said"),
    ("سعيد", "Port Said"),
    ("البحر الأحمر", "Red Sea"),
    ("البحر الاحمر", "Red Sea"),
    ("بحر أحمر", "Red Sea"),
    ("بحر احمر", "Red Sea"),
    ("البحر", "Red Sea"),
    ("الأحمر", "Red Sea"),
    ("الاحمر", "Red Sea"),
    ("أحمر", "Red Sea"),
    ("احمر", "Red Sea"),
    ("دمياط", "Damietta"),
    ("الفيوم", "Fayoum"),
    ("فيوم", "Fayoum"),
    ("كفر الشيخ", "Kafr el-Sheikh"),
    ("كفر شيخ", "Kafr el-Sheikh"),
    ("كفر", "Kafr el-Sheikh"),
    ("شيخ", "Kafr el-Sheikh"),
    ("الشيخ", "Kafr el-Sheikh"),
    ("مرسى مطروح", "Matrouh"),
    ("مطروح", "Matrouh"),
    ("مرسى", "Matrouh"),
    ("المرسى", "Matrouh"),
    ("الوادي الجديد", "New Valley"),
    ("الوادى الجديد", "New Valley"),
    ("وادي", "New Valley"),
    ("وادى", "New Valley"),
    ("الوادي", "New Valley"),
    ("الوادى", "New Valley"),
    ("الجديد", "New Valley"),
    ("جديد", "New Valley"),
    ("شمال سيناء", "North Sinai"),
    ("شمال سينا", "North Sinai"),
    ("شمال", "North Sinai"),
    ("الشمال", "North Sinai"),
    ("جنوب سيناء", "South Sinai"),
    ("جنوب سينا", "South Sinai"),
    ("جنوب", "South Sinai"),
    ("الجنوب", "South Sinai"),
    ("سيناء", "North Sinai"),
    ("سينا", "North Sinai"),
    ("السويس", "Suez"),
    ("سويس", "Suez"),
    ("قناة السويس", "Suez"),
    ("قناه السويس", "Suez"),
    ("القناة", "Suez"),
    ("القناه", "Suez"),
    ("الأقصر", "Luxor"),
    ("الاقصر", "Luxor"),
    ("أقصر", "Luxor"),
    ("اقصر", "Luxor"),
    ("الاسماعيلية", "Ismailia"),
    ("الاسماعيليه", "Ismailia"),
    ("الإسماعيلية", "Ismailia"),
    ("الإسماعيليه", "Ismailia"),
    ("الأسماعيلية", "Ismailia"),
    ("الأسماعيليه", "Ismailia"),
    ("اسماعيلية", "Ismailia"),
    ("اسماعيليه", "Ismailia"),
    ("إسماعيلية", "Ismailia"),
    ("إسماعيليه", "Ismailia"),
    ("أسماعيلية", "Ismailia"),
    ("أسماعيليه", "Ismailia"),
    ("الاسماعلية", "Ismailia"),
    ("الاسماعليه", "Ismailia"),
    ("الإسماعلية", "Ismailia"),
    ("الإسماعليه", "Ismailia"),
    ("الأسماعلية", "Ismailia"),
    ("الأسماعليه", "Ismailia"),
    ("اسماعلية", "Ismailia"),
    ("اسماعليه", "Ismailia"),
    ("إسماعلية", "Ismailia"),
    ("إسماعليه", "Ismailia"),
    ("أسماعلية", "Ismailia"),
    ("أسماعليه", "Ismailia"),
];

/// Government spellings searched in photo-album captions, in scan order.
///
/// Captions are free text, so this list leaves out the bare fragments
/// (`"بور"`, `"كفر"`, ...) that [`GOVERNMENTS`] carries.
pub const ALBUM_GOVERNMENTS: &[&str] = &[
    "الأسكندرية",
    "الاسكندرية",
    "الإسكندرية",
    "اسيوط",
    "أسيوط",
    "اسوان",
    "أسوان",
    "سوهاج",
    "المنيا",
    "منيا",
    "الجيزة",
    "الجيزه",
    "جيزه",
    "الاسكندريه",
    "القاهرة",
    "القاهره",
    "قاهرة",
    "قاهره",
    "الدقهلية",
    "الدقهليه",
    "دقهلية",
    "دقهليه",
    "الأقصر",
    "الاقصر",
    "أقصر",
    "اقصر",
    "كفر الشيخ",
    "مرسى مطروح",
    "مطروح",
    "قنا",
    "السويس",
    "دمياط",
    "جنوب سيناء",
    "البحيره",
    "البحيرة",
    "بحيرة",
    "بحيره",
    "الوادي الجديد",
    "الوادى الجديد",
    "المنوفية",
    "المنوفيه",
    "منوفيه",
    "منوفية",
    "القليوبية",
    "القليوبيه",
    "قليوبية",
    "قليوبيه",
    "الفيوم",
    "فيوم",
    "الغربية",
    "الغربيه",
    "غربية",
    "غربيه",
    "شمال سيناء",
    "شمال سينا",
    "جنوب سينا",
    "الشرقية",
    "الشرقيه",
    "شرقية",
    "شرقيه",
    "بور سعيد",
    "بني سويف",
    "بنى سويف",
    "البحر الأحمر",
    "البحر الاحمر",
    "بحر أحمر",
    "بحر احمر",
    "الاسماعيلية",
    "الإسماعيلية",
    "اسماعيلية",
    "إسماعيلية",
    "الاسماعيليه",
    "الإسماعيليه",
    "اسماعيليه",
    "إسماعيليه",
    "الاسماعليه",
    "اسماعليه",
    "إسماعلية",
    "إسماعليه",
];

/// Transliterate an Arabic name letter by letter, then title-case the result.
///
/// Letters missing from the table (spaces, diacritics, Latin text) pass
/// through unchanged. Pure function of its input.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(transliterate("محمد علي"), "Mhmd Ali");
/// ```
pub fn transliterate(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| match LETTER_MAP.get(&c) {
            Some(latin) => (*latin).to_string(),
            None => c.to_string(),
        })
        .collect();
    title_case(&mapped)
}

/// Find the government mentioned in `text`.
///
/// Returns `(arabic, english)` for the first [`GOVERNMENTS`] entry that is a
/// substring of `text`, or the `("مفقود", "Null")` sentinel pair.
pub fn find_government(text: &str) -> (&'static str, &'static str) {
    GOVERNMENTS
        .iter()
        .find(|(arabic, _)| text.contains(arabic))
        .copied()
        .unwrap_or((UNKNOWN_GOVERNMENT_ARABIC, UNKNOWN_GOVERNMENT_ENGLISH))
}

/// Find the first [`ALBUM_GOVERNMENTS`] spelling in a caption.
pub fn find_album_government(caption: &str) -> &'static str {
    ALBUM_GOVERNMENTS
        .iter()
        .find(|gov| caption.contains(*gov))
        .copied()
        .unwrap_or(UNKNOWN_GOVERNMENT_ARABIC)
}

/// Exact lookup of a government spelling's English name.
pub fn government_english(arabic: &str) -> Option<&'static str> {
    if arabic == UNKNOWN_GOVERNMENT_ARABIC {
        return Some(UNKNOWN_GOVERNMENT_ENGLISH);
    }
    GOVERNMENTS
        .iter()
        .find(|(spelling, _)| *spelling == arabic)
        .map(|(_, english)| *english)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transliterate_single_name() {
        assert_eq!(transliterate("محمد"), "Mhmd");
    }

    #[test]
    fn test_transliterate_title_cases_each_word() {
        assert_eq!(transliterate("محمد علي"), "Mhmd Ali");
        assert_eq!(transliterate("شريف"), "Shrif");
    }

    #[test]
    fn test_transliterate_passes_unmapped_through() {
        // Alef madda is not in the table.
        assert_eq!(transliterate("آدم"), "آDm");
        assert_eq!(transliterate("Sara 2"), "Sara 2");
    }

    #[test]
    fn test_transliterate_is_deterministic() {
        let name = "عبد الرحمن السيد";
        assert_eq!(transliterate(name), transliterate(name));
        assert_eq!(transliterate(name), "Abd Alrhmn Alsid");
    }

    #[test]
    fn test_find_government_cairo() {
        let text = "تاريخ الفقد 2015 محافظة القاهرة";
        assert_eq!(find_government(text), ("القاهرة", "Cairo"));
    }

    #[test]
    fn test_find_government_unmatched() {
        assert_eq!(find_government("لا يوجد"), ("مفقود", "Null"));
        assert_eq!(find_government(""), ("مفقود", "Null"));
    }

    #[test]
    fn test_find_government_first_entry_wins() {
        // Both Giza and Cairo occur; Giza comes first in the table.
        let text = "القاهرة ثم الجيزة";
        assert_eq!(find_government(text), ("الجيزة", "Giza"));
    }

    #[test]
    fn test_find_government_short_entry_shadows() {
        // A bare "سعيد" in a person's name still resolves to Port Said.
        assert_eq!(find_government("بور سعيد"), ("بور سعيد", "Port Said"));
        assert_eq!(find_government("أحمد سعيد"), ("سعيد", "Port Said"));
    }

    #[test]
    fn test_find_album_government() {
        assert_eq!(find_album_government("أحمد من الفيوم"), "الفيوم");
        assert_eq!(find_album_government("أحمد"), "مفقود");
    }

    #[test]
    fn test_government_english_exact_lookup() {
        assert_eq!(government_english("الفيوم"), Some("Fayoum"));
        assert_eq!(government_english("مفقود"), Some("Null"));
        assert_eq!(government_english("باريس"), None);
    }
}
