use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref ENGLISH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Stop-word list applied after lowercasing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopWords {
    #[default]
    English,
    None,
    /// Custom words, stored lowercased.
    Custom(Vec<String>),
}

impl StopWords {
    /// Build a custom list from newline-separated text. Blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> Self {
        let mut words: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| l.nfkc().collect::<String>().to_lowercase())
            .collect();
        words.sort();
        words.dedup();
        StopWords::Custom(words)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub stop_words: StopWords,
    /// Reduce tokens to their English Snowball stem.
    pub stem: bool,
}

/// Tokenizer bound to one configuration. Custom stop words are hashed once here.
pub struct Tokenizer {
    custom: HashSet<String>,
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        let custom = match &config.stop_words {
            StopWords::Custom(words) => words.iter().cloned().collect(),
            _ => HashSet::new(),
        };
        Self { custom, config }
    }


    fn is_stopword(&self, token: &str) -> bool {
        match self.config.stop_words {
            StopWords::English => ENGLISH_STOPWORDS.contains(token),
            StopWords::None => false,
            StopWords::Custom(_) => self.custom.contains(token),
        }
    }

    /// Tokenize text into terms using NFKC normalization, lowercase, stopword removal, and optional stemming.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut tokens = Vec::new();
        for mat in RE.find_iter(&normalized) {
            let token = mat.as_str();
            if self.is_stopword(token) { continue; }
            if self.config.stem {
                tokens.push(STEMMER.stem(token).to_string());
            } else {
                tokens.push(token.to_string());
            }
        }
        tokens
    }
}

/// Tokenize with the default configuration (English stop words, no stemming).
pub fn tokenize(text: &str) -> Vec<String> {
    Tokenizer::new(TokenizerConfig::default()).tokenize(text)
}
