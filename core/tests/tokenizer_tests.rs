use cinesim_core::tokenizer::{tokenize, StopWords, Tokenizer, TokenizerConfig};

#[test]
fn it_normalizes_and_stems() {
    let tok = Tokenizer::new(TokenizerConfig { stop_words: StopWords::English, stem: true });
    let words = tok.tokenize("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Unicode normalization keeps accented letters as one token
    assert!(words.iter().any(|w| w.starts_with("caf")));
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"fox".to_string()));
}

#[test]
fn it_ignores_punctuation_and_numbers() {
    let words = tokenize("Adventure|Animation|Children (1995)");
    assert_eq!(words, vec!["adventure", "animation", "children"]);
}
