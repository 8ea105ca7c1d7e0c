//! Catalog of well-known field names used to guess a generator from a
//! column name.

use datafill_core::DataType;
use serde::Serialize;

/// Output kind of a catalog entry, used to skip entries whose values do
/// not fit the column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Text,
    Date,
    Uuid,
}

impl EntryKind {
    pub fn accepts(&self, data_type: &DataType) -> bool {
        match self {
            EntryKind::Text => matches!(
                data_type,
                DataType::Text { .. } | DataType::Char { .. } | DataType::Opaque { .. }
            ),
            EntryKind::Date => matches!(data_type, DataType::Date | DataType::Timestamp),
            EntryKind::Uuid => match data_type {
                DataType::Uuid | DataType::Opaque { .. } => true,
                DataType::Text { max_length } | DataType::Char { length: max_length } => {
                    max_length.is_none_or(|len| len >= 36)
                }
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub generator_id: &'static str,
    pub kind: EntryKind,
    pub aliases: &'static [&'static str],
}

const fn entry(
    name: &'static str,
    generator_id: &'static str,
    kind: EntryKind,
    aliases: &'static [&'static str],
) -> CatalogEntry {
    CatalogEntry {
        name,
        generator_id,
        kind,
        aliases,
    }
}

/// Entries in tie-break order: on equal scores the earlier entry wins.
pub const CATALOG: &[CatalogEntry] = &[
    entry("first_name", "person.first_name", EntryKind::Text, &["first_name", "firstname", "given_name", "forename", "fname"]),
    entry("last_name", "person.last_name", EntryKind::Text, &["last_name", "lastname", "surname", "family_name", "lname"]),
    entry("full_name", "person.full_name", EntryKind::Text, &["full_name", "name", "fullname", "display_name"]),
    entry("email", "internet.email", EntryKind::Text, &["email", "email_address", "mail", "e_mail"]),
    entry("phone", "phone.number", EntryKind::Text, &["phone", "phone_number", "telephone", "mobile", "cell_phone"]),
    entry("username", "internet.username", EntryKind::Text, &["username", "user_name", "login", "handle"]),
    entry("street_address", "address.street", EntryKind::Text, &["street_address", "address", "street", "address_line"]),
    entry("city", "address.city", EntryKind::Text, &["city", "town"]),
    entry("state", "address.state", EntryKind::Text, &["state", "province", "region"]),
    entry("country", "address.country", EntryKind::Text, &["country", "nation"]),
    entry("postal_code", "address.postal_code", EntryKind::Text, &["postal_code", "zip", "zip_code", "postcode"]),
    entry("company", "company.name", EntryKind::Text, &["company", "company_name", "organization", "employer"]),
    entry("job_title", "job.title", EntryKind::Text, &["job_title", "position", "occupation", "job"]),
    entry("url", "internet.url", EntryKind::Text, &["url", "website", "homepage", "link"]),
    entry("ip_address", "internet.ip_address", EntryKind::Text, &["ip_address", "ip", "ipv4"]),
    entry("date_of_birth", "person.date_of_birth", EntryKind::Date, &["date_of_birth", "birth_date", "dob", "birthday"]),
    entry("isbn", "book.isbn", EntryKind::Text, &["isbn", "isbn13"]),
    entry("title", "text.title", EntryKind::Text, &["title", "book_title", "headline"]),
    entry("description", "text.paragraph", EntryKind::Text, &["description", "summary", "notes", "comment", "bio"]),
    entry("uuid", "uuid.v4", EntryKind::Uuid, &["uuid", "guid"]),
];

/// Best catalog hit for a column name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogMatch {
    pub entry: &'static CatalogEntry,
    pub alias: &'static str,
    pub score: f64,
}

impl PartialEq for CatalogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Highest-scoring entry compatible with `data_type`, regardless of any
/// threshold. Ties keep the earlier entry.
pub fn best_match(column_name: &str, data_type: &DataType) -> Option<CatalogMatch> {
    let normalized = normalize_name(column_name);
    if normalized.is_empty() {
        return None;
    }

    let mut best: Option<CatalogMatch> = None;
    for entry in CATALOG.iter().filter(|entry| entry.kind.accepts(data_type)) {
        for alias in entry.aliases {
            let score = jaro_winkler(&normalized, alias);
            if best.is_none_or(|current| score > current.score) {
                best = Some(CatalogMatch {
                    entry,
                    alias: *alias,
                    score,
                });
            }
        }
    }
    best
}

/// Catalog hit at or above `threshold`.
pub fn guess(column_name: &str, data_type: &DataType, threshold: f64) -> Option<CatalogMatch> {
    best_match(column_name, data_type).filter(|hit| hit.score >= threshold)
}

/// Lowercase, split camelCase and unify separators to `_`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && prev_lower_or_digit {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower_or_digit = false;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Jaro similarity in `[0, 1]`.
pub fn jaro(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    if left == right {
        return 1.0;
    }
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let window = (left.len().max(right.len()) / 2).saturating_sub(1);
    let mut left_matched = vec![false; left.len()];
    let mut right_matched = vec![false; right.len()];
    let mut matches = 0_usize;

    for (i, ch) in left.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(right.len());
        for j in start..end {
            if !right_matched[j] && right[j] == *ch {
                left_matched[i] = true;
                right_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0_usize;
    let mut k = 0_usize;
    for (i, ch) in left.iter().enumerate() {
        if !left_matched[i] {
            continue;
        }
        while !right_matched[k] {
            k += 1;
        }
        if *ch != right[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let t = transpositions as f64 / 2.0;
    (m / left.len() as f64 + m / right.len() as f64 + (m - t) / m) / 3.0
}

/// Jaro-Winkler similarity with a common prefix of up to 4 characters and
/// scaling factor 0.1.
pub fn jaro_winkler(left: &str, right: &str) -> f64 {
    let sim = jaro(left, right);
    let prefix = left
        .chars()
        .zip(right.chars())
        .take(4)
        .take_while(|(a, b)| a == b)
        .count();
    sim + prefix as f64 * 0.1 * (1.0 - sim)
}
