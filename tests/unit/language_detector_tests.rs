/*!
 * Tests for the language detection cascade
 */

use dubsync::app_config::CaptionConfig;
use dubsync::caption_parser::Track;
use dubsync::language_detector::{
    classify_text, detect_language, from_character_ranges, from_document_language, from_url_hint,
    DetectionInput,
};
use crate::common;

fn input<'a>(url: &'a str, payload: &'a str, cue_texts: &'a [&'a str]) -> DetectionInput<'a> {
    DetectionInput { url, payload, cue_texts }
}

/// Test the character classes called out for each language
#[test]
fn test_classify_text_withDiagnosticCharacters_shouldReturnLanguage() {
    assert_eq!(classify_text("¿Cómo estás?"), Some("es"));
    assert_eq!(classify_text("Mañana"), Some("es"));
    assert_eq!(classify_text("Très bien, merci"), Some("fr"));
    assert_eq!(classify_text("Grüß dich"), Some("de"));
    assert_eq!(classify_text("Não sei"), Some("pt"));
    assert_eq!(classify_text("Però così"), Some("it"));
    assert_eq!(classify_text("こんにちは"), Some("ja"));
    assert_eq!(classify_text("カタカナ"), Some("ja"));
    assert_eq!(classify_text("안녕하세요"), Some("ko"));
    assert_eq!(classify_text("我爱学习中文"), Some("zh"));
    assert_eq!(classify_text("مرحبا"), Some("ar"));
    assert_eq!(classify_text("नमस्ते"), Some("hi"));
}

/// Test that French cedilla sentences with a grave or circumflex stay French
#[test]
fn test_classify_text_withFrenchCedilla_shouldPreferFrench() {
    assert_eq!(classify_text("Ça, c'est déjà fait."), Some("fr"));
    assert_eq!(classify_text("Voilà le garçon"), Some("fr"));
    assert_eq!(classify_text("Où êtes-vous?"), Some("fr"));
    assert_eq!(classify_text("Faço isso amanhã"), Some("pt"));
}

/// Test that plain ASCII text matches no class
#[test]
fn test_classify_text_withPlainText_shouldReturnNone() {
    assert_eq!(classify_text("Hello, how are you?"), None);
    assert_eq!(classify_text(""), None);
}

/// Test that kana wins over kanji in mixed Japanese text
#[test]
fn test_classify_text_withKanjiAndKana_shouldPreferJapanese() {
    assert_eq!(classify_text("日本語を勉強します"), Some("ja"));
}

/// Test the URL hint strategy
#[test]
fn test_from_url_hint_withLanguageParameter_shouldExtractCode() {
    let none: [&str; 0] = [];
    assert_eq!(from_url_hint(&input("https://cdn.example/?o=1&lang=de", "", &none)), Some("de".to_string()));
    assert_eq!(from_url_hint(&input("https://cdn.example/?o=1&hl=PT-br", "", &none)), Some("pt".to_string()));
    assert_eq!(from_url_hint(&input("https://cdn.example/?o=1&lang=english", "", &none)), None);
    assert_eq!(from_url_hint(&input("https://cdn.example/?o=1", "", &none)), None);
    assert_eq!(from_url_hint(&input("::not a url::", "", &none)), None);
}

/// Test the document language strategy
#[test]
fn test_from_document_language_withRegionTag_shouldReduceToBase() {
    let none: [&str; 0] = [];
    let tagged = common::clock_payload(Some("fr-CA"), &[]);
    let plain_lang = r#"<tt lang="ko"><body/></tt>"#;

    assert_eq!(from_document_language(&input("", &tagged, &none)), Some("fr".to_string()));
    assert_eq!(from_document_language(&input("", plain_lang, &none)), Some("ko".to_string()));
    assert_eq!(from_document_language(&input("", common::CLOCK_PAYLOAD, &none)), None);
    assert_eq!(from_document_language(&input("", "<broken", &none)), None);
}

/// Test the character range strategy needs cue text
#[test]
fn test_from_character_ranges_withoutCues_shouldPass() {
    let none: [&str; 0] = [];
    assert_eq!(from_character_ranges(&input("", "", &none)), None);

    let texts = ["Hello", "¡Vamos!"];
    assert_eq!(from_character_ranges(&input("", "", &texts)), Some("es".to_string()));
}

/// Test cascade priority: URL over document over characters
#[test]
fn test_detect_language_shouldUseFirstSuccessfulStrategy() {
    let texts = ["こんにちは"];
    let payload = common::clock_payload(Some("de-DE"), &[]);

    let from_url = input("https://cdn.example/?o=1&lang=it", &payload, &texts);
    assert_eq!(detect_language(&from_url, "en"), "it");

    let from_doc = input("https://cdn.example/?o=1", &payload, &texts);
    assert_eq!(detect_language(&from_doc, "en"), "de");

    let from_text = input("https://cdn.example/?o=1", common::CLOCK_PAYLOAD, &texts);
    assert_eq!(detect_language(&from_text, "en"), "ja");
}

/// Test that unknown codes fall through to later strategies
#[test]
fn test_detect_language_withUnknownCode_shouldFallThrough() {
    let texts = ["안녕하세요"];
    let payload = common::clock_payload(Some("xx-YY"), &[]);
    let detection = input("https://cdn.example/?o=1&lang=zz", &payload, &texts);

    assert_eq!(detect_language(&detection, "en"), "ko");
}

/// Test the default when nothing matches
#[test]
fn test_detect_language_withNoSignal_shouldReturnDefault() {
    let texts = ["Hello there", "General Kenobi"];
    let detection = input("https://cdn.example/?o=1", common::CLOCK_PAYLOAD, &texts);

    assert_eq!(detect_language(&detection, "en"), "en");
}

/// Test that only the configured number of cues is sampled
#[test]
fn test_track_from_payload_shouldSampleLeadingCuesOnly() {
    let payload = common::clock_payload(None, &[
        ("00:00:01.000", "00:00:02.000", "One"),
        ("00:00:02.000", "00:00:03.000", "Two"),
        ("00:00:03.000", "00:00:04.000", "Grüße"),
    ]);

    let narrow = CaptionConfig { language_sample_size: 2, ..CaptionConfig::default() };
    let wide = CaptionConfig { language_sample_size: 3, ..CaptionConfig::default() };

    assert_eq!(Track::from_payload(&payload, "https://cdn.example/?o=1", &narrow).language(), "en");
    assert_eq!(Track::from_payload(&payload, "https://cdn.example/?o=1", &wide).language(), "de");
}
