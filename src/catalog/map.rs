use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::client::{RawGenre, RawMovie};
use crate::models::{GenreSummary, Movie};

const UNKNOWN_TITLE: &str = "Unknown Title";

pub(crate) fn map_movie(raw: RawMovie) -> Movie {
    let title = non_blank(raw.title).unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let genres = raw
        .genres
        .unwrap_or_default()
        .into_iter()
        .filter_map(|g| non_blank(g.title))
        .collect();

    Movie {
        id: raw.id,
        title,
        year: raw.date_published.as_deref().and_then(parse_year),
        runtime: raw.duration.as_deref().and_then(parse_duration_minutes),
        genres,
        director: join_names(raw.directors),
        actors: join_names(raw.main_actors),
        plot: non_blank(raw.summary),
        poster_url: non_blank(raw.poster_url),
        rating: raw.rating_value,
        vote_count: raw.rating_count,
    }
}

pub(crate) fn map_genres(raw: Vec<RawGenre>) -> Vec<GenreSummary> {
    let mut summaries: Vec<GenreSummary> = raw
        .into_iter()
        .map(|g| {
            let title = non_blank(g.title).unwrap_or_else(|| g.id.clone());
            GenreSummary {
                movie_count: g.movies.map(|m| m.len()).unwrap_or(0),
                id: g.id,
                title,
            }
        })
        .collect();
    sort_genres(&mut summaries);
    summaries
}

pub(crate) fn map_genre_index(index: BTreeMap<String, Value>) -> Vec<GenreSummary> {
    let mut summaries: Vec<GenreSummary> = index
        .into_iter()
        .filter_map(|(name, ids)| match ids {
            Value::Array(ids) => Some(GenreSummary {
                id: name.clone(),
                title: name,
                movie_count: ids.len(),
            }),
            _ => None,
        })
        .collect();
    sort_genres(&mut summaries);
    summaries
}

fn sort_genres(summaries: &mut [GenreSummary]) {
    summaries.sort_by(|a, b| match b.movie_count.cmp(&a.movie_count) {
        Ordering::Equal => a.title.cmp(&b.title),
        other => other,
    });
}

/// Parses an ISO-8601 `PT#H#M#S` duration into whole minutes. Seconds are
/// rounded to the nearest minute. Zero and malformed input give `None`.
pub(crate) fn parse_duration_minutes(input: &str) -> Option<u32> {
    let upper = input.trim().to_ascii_uppercase();
    let rest = upper.strip_prefix("PT")?;

    let mut hours = 0f64;
    let mut minutes = 0f64;
    let mut seconds = 0f64;
    let mut number = String::new();
    let mut last_unit = 0u8;

    for ch in rest.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            number.push(ch);
            continue;
        }
        let unit = match ch {
            'H' => 1,
            'M' => 2,
            'S' => 3,
            _ => return None,
        };
        // Units appear once each, in H, M, S order.
        if unit <= last_unit || number.is_empty() {
            return None;
        }
        if unit != 3 && number.contains('.') {
            return None;
        }
        let value: f64 = number.parse().ok()?;
        match unit {
            1 => hours = value,
            2 => minutes = value,
            _ => seconds = value,
        }
        last_unit = unit;
        number.clear();
    }
    if !number.is_empty() {
        return None;
    }

    let total = hours * 60.0 + minutes + (seconds / 60.0).round();
    if !total.is_finite() || total <= 0.0 || total > f64::from(u32::MAX) {
        return None;
    }
    Some(total as u32)
}

pub(crate) fn parse_year(date: &str) -> Option<i32> {
    let prefix = date.trim().get(..4)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

fn join_names(names: Option<Vec<String>>) -> Option<String> {
    let names: Vec<String> = names
        .unwrap_or_default()
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
