use crate::MovieId;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    /// Text the vectorizer sees for this movie.
    pub feature_text: String,
}

impl Movie {
    pub fn genres_joined(&self) -> String { self.genres.join("|") }
}

/// Split a raw genre cell, dropping empty pieces.
pub fn parse_genres(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// Column layout of a raw movie table fed to the indexer.
#[derive(Debug, Clone)]
pub struct CorpusColumns {
    pub id: String,
    pub title: String,
    pub genres: String,
    /// When unset, feature text is `title + " " + genres`.
    pub feature: Option<String>,
    pub genre_separator: char,
}

impl Default for CorpusColumns {
    fn default() -> Self {
        Self {
            id: "movieId".into(),
            title: "title".into(),
            genres: "genres".into(),
            feature: None,
            genre_separator: '|',
        }
    }
}

fn column_position(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| anyhow!("column {name:?} not found in header"))
}

/// Read a raw movie table. Rows with an unparseable id are skipped and counted.
pub fn read_raw_movies(path: &Path, columns: &CorpusColumns) -> Result<(Vec<Movie>, usize)> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = rdr.headers()?.clone();
    let id_pos = column_position(&headers, &columns.id)?;
    let title_pos = column_position(&headers, &columns.title)?;
    let genres_pos = column_position(&headers, &columns.genres)?;
    let feature_pos = match &columns.feature {
        Some(name) => Some(column_position(&headers, name)?),
        None => None,
    };

    let mut movies = Vec::new();
    let mut skipped = 0usize;
    for (row, record) in rdr.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(row, error = %e, "skipping unreadable record");
                skipped += 1;
                continue;
            }
        };
        let id = match record.get(id_pos).and_then(|v| v.parse::<MovieId>().ok()) {
            Some(id) => id,
            None => {
                tracing::warn!(row, "skipping record without a valid movie id");
                skipped += 1;
                continue;
            }
        };
        let title = record.get(title_pos).unwrap_or("").to_string();
        let raw_genres = record.get(genres_pos).unwrap_or("");
        let genres = parse_genres(raw_genres, columns.genre_separator);
        let feature_text = match feature_pos {
            Some(pos) => record.get(pos).unwrap_or("").to_string(),
            None => format!("{} {}", title, genres.join(" ")),
        };
        movies.push(Movie { id, title, genres, feature_text });
    }
    Ok((movies, skipped))
}

#[derive(Debug, Serialize, Deserialize)]
struct CorpusRow {
    movie_id: MovieId,
    title: String,
    genres: String,
    feature_text: String,
}

/// Write the canonical corpus table (`movie_id,title,genres,feature_text`, genres `|`-joined).
pub fn write_corpus_table(path: &Path, movies: &[Movie]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for m in movies {
        wtr.serialize(CorpusRow {
            movie_id: m.id,
            title: m.title.clone(),
            genres: m.genres_joined(),
            feature_text: m.feature_text.clone(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read the canonical corpus table. Any malformed row fails the whole load.
pub fn read_corpus_table(path: &Path) -> Result<Vec<Movie>> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut movies = Vec::new();
    for (row, record) in rdr.deserialize::<CorpusRow>().enumerate() {
        let r = record.with_context(|| format!("corrupt corpus row {row}"))?;
        movies.push(Movie {
            id: r.movie_id,
            title: r.title,
            genres: parse_genres(&r.genres, '|'),
            feature_text: r.feature_text,
        });
    }
    Ok(movies)
}

/// Movies in row order plus the id → row mapping.
#[derive(Debug, Clone)]
pub struct Corpus {
    movies: Vec<Movie>,
    index: HashMap<MovieId, usize>,
}

impl Corpus {
    /// Build a corpus whose mapping is derived from row order. Duplicate ids are rejected.
    pub fn new(movies: Vec<Movie>) -> Result<Self> {
        let mut index = HashMap::with_capacity(movies.len());
        for (i, m) in movies.iter().enumerate() {
            if let Some(prev) = index.insert(m.id, i) {
                bail!("duplicate movie id {} at rows {prev} and {i}", m.id);
            }
        }
        Ok(Self { movies, index })
    }

    /// Build a corpus and check it against a persisted row → id mapping.
    pub fn with_id_map(movies: Vec<Movie>, id_map: &BTreeMap<usize, MovieId>) -> Result<Self> {
        let corpus = Self::new(movies)?;
        if id_map.len() != corpus.len() {
            bail!("id mapping has {} entries but corpus has {} movies", id_map.len(), corpus.len());
        }
        for (&row, &id) in id_map {
            match corpus.movies.get(row) {
                Some(m) if m.id == id => {}
                Some(m) => bail!("id mapping says row {row} is movie {id}, corpus has {}", m.id),
                None => bail!("id mapping row {row} is out of range"),
            }
        }
        Ok(corpus)
    }

    pub fn len(&self) -> usize { self.movies.len() }
    pub fn is_empty(&self) -> bool { self.movies.is_empty() }
    pub fn movies(&self) -> &[Movie] { &self.movies }
    pub fn get(&self, row: usize) -> Option<&Movie> { self.movies.get(row) }
    pub fn index_of(&self, id: MovieId) -> Option<usize> { self.index.get(&id).copied() }

    pub fn feature_texts(&self) -> Vec<&str> {
        self.movies.iter().map(|m| m.feature_text.as_str()).collect()
    }

    pub fn id_map(&self) -> BTreeMap<usize, MovieId> {
        self.movies.iter().enumerate().map(|(i, m)| (i, m.id)).collect()
    }

    /// Case-insensitive substring match over titles, in corpus order.
    pub fn search_title(&self, needle: &str) -> Vec<&Movie> {
        let needle = needle.to_lowercase();
        self.movies
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn movie(id: MovieId, title: &str) -> Movie {
        Movie { id, title: title.into(), genres: vec![], feature_text: title.into() }
    }

    #[test]
    fn raw_table_derives_feature_text() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "movieId,title,genres").unwrap();
        writeln!(f, "1,Toy Story (1995),Adventure|Animation|Children").unwrap();
        writeln!(f, "x,Broken,Drama").unwrap();
        writeln!(f, "3, Heat (1995) ,Action|Crime|Thriller").unwrap();
        let (movies, skipped) = read_raw_movies(f.path(), &CorpusColumns::default()).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].genres, vec!["Adventure", "Animation", "Children"]);
        assert_eq!(movies[0].feature_text, "Toy Story (1995) Adventure Animation Children");
        assert_eq!(movies[1].title, "Heat (1995)");
    }

    #[test]
    fn raw_table_uses_named_feature_column() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "id,name,genres,content_features").unwrap();
        writeln!(f, "7,Alien,Horror|Sci-Fi,space horror crew").unwrap();
        writeln!(f, "8,Up,Animation,").unwrap();
        let columns = CorpusColumns {
            id: "id".into(),
            title: "name".into(),
            feature: Some("content_features".into()),
            ..CorpusColumns::default()
        };
        let (movies, _) = read_raw_movies(f.path(), &columns).unwrap();
        assert_eq!(movies[0].feature_text, "space horror crew");
        assert_eq!(movies[1].feature_text, "");
    }

    #[test]
    fn missing_column_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "movieId,title").unwrap();
        assert!(read_raw_movies(f.path(), &CorpusColumns::default()).is_err());
    }

    #[test]
    fn duplicate_ids_rejected() {
        assert!(Corpus::new(vec![movie(1, "A"), movie(1, "B")]).is_err());
    }

    #[test]
    fn id_map_must_match_rows() {
        let movies = vec![movie(10, "A"), movie(20, "B")];
        let good: BTreeMap<usize, MovieId> = [(0, 10), (1, 20)].into_iter().collect();
        assert!(Corpus::with_id_map(movies.clone(), &good).is_ok());
        let swapped: BTreeMap<usize, MovieId> = [(0, 20), (1, 10)].into_iter().collect();
        assert!(Corpus::with_id_map(movies.clone(), &swapped).is_err());
        let short: BTreeMap<usize, MovieId> = [(0, 10)].into_iter().collect();
        assert!(Corpus::with_id_map(movies, &short).is_err());
    }

    #[test]
    fn title_search_is_case_insensitive() {
        let corpus = Corpus::new(vec![movie(1, "Toy Story"), movie(2, "Die Hard"), movie(3, "Toy Story 2")]).unwrap();
        let ids: Vec<MovieId> = corpus.search_title("TOY").iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(corpus.search_title("zzz").is_empty());
    }
}
