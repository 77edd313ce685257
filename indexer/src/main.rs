use anyhow::{Context, Result};
use cinesim_core::movie::read_raw_movies;
use cinesim_core::persist::{save_model, save_similarity, ModelPaths};
use cinesim_core::similarity::pairwise;
use cinesim_core::tokenizer::{StopWords, TokenizerConfig};
use cinesim_core::{Corpus, CorpusColumns, IdfSmoothing, TfidfVectorizer, VectorizerConfig};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cinesim-indexer")]
#[command(about = "Fit the TF-IDF model over a movie table and write the model directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the model directory from a movie CSV file
    Build {
        /// Input CSV path
        #[arg(long)]
        input: String,
        /// Output model directory
        #[arg(long, default_value = "./models")]
        output: String,
        #[arg(long, default_value = "movieId")]
        id_column: String,
        #[arg(long, default_value = "title")]
        title_column: String,
        #[arg(long, default_value = "genres")]
        genres_column: String,
        /// Column holding the text to vectorize; defaults to title + genres
        #[arg(long)]
        feature_column: Option<String>,
        #[arg(long, default_value_t = '|')]
        genre_separator: char,
        /// `english`, `none`, or a path to a file with one stop word per line
        #[arg(long, default_value = "english")]
        stop_words: String,
        /// Use idf = ln(N/df) instead of ln((1+N)/(1+df)) + 1
        #[arg(long, default_value_t = false)]
        plain_idf: bool,
        /// Use tf = 1 + ln(count) instead of the raw count
        #[arg(long, default_value_t = false)]
        sublinear_tf: bool,
        /// Apply English stemming to tokens
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Also compute and store the pairwise similarity matrix
        #[arg(long, default_value_t = false)]
        precompute: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            id_column,
            title_column,
            genres_column,
            feature_column,
            genre_separator,
            stop_words,
            plain_idf,
            sublinear_tf,
            stem,
            precompute,
        } => {
            let columns = CorpusColumns {
                id: id_column,
                title: title_column,
                genres: genres_column,
                feature: feature_column,
                genre_separator,
            };
            let config = VectorizerConfig {
                tokenizer: TokenizerConfig { stop_words: parse_stop_words(&stop_words)?, stem },
                idf: if plain_idf { IdfSmoothing::Plain } else { IdfSmoothing::Smooth },
                sublinear_tf,
            };
            build_model(Path::new(&input), &output, &columns, config, precompute)
        }
    }
}

fn parse_stop_words(arg: &str) -> Result<StopWords> {
    match arg {
        "english" => Ok(StopWords::English),
        "none" => Ok(StopWords::None),
        path => {
            let text = fs::read_to_string(path).with_context(|| format!("reading stop words from {path}"))?;
            Ok(StopWords::from_lines(&text))
        }
    }
}

fn build_model(
    input: &Path,
    output: &str,
    columns: &CorpusColumns,
    config: VectorizerConfig,
    precompute: bool,
) -> Result<()> {
    let (movies, skipped) = read_raw_movies(input, columns)?;
    tracing::info!(num_movies = movies.len(), skipped, "read movie table");
    let corpus = Corpus::new(movies)?;

    let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&corpus.feature_texts(), config)?;
    tracing::info!(num_terms = vectorizer.vocabulary_len(), nnz = matrix.nnz(), "fitted tf-idf vectorizer");

    let paths = ModelPaths::new(output);
    let meta = save_model(&paths, &corpus, &vectorizer, &matrix)?;

    if precompute {
        let sim = pairwise(&matrix);
        save_similarity(&paths.similarity(), &meta.fingerprint, &sim)?;
        tracing::info!(rows = sim.dim(), "stored similarity matrix");
    }

    tracing::info!(output, fingerprint = %meta.fingerprint, "model build complete");
    Ok(())
}
