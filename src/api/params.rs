use crate::core::error::{Error, Result};
use crate::core::types::Gender;
use crate::query::filter::Filter;

const MAX_COUNTRY_CHARS: usize = 50;

/// Query keys one aggregate route reads. Keys outside the set are never
/// looked at, so an invalid value there cannot fail the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKeys {
    /// `fromDate`, `toDate`, `country`, `toDistance`
    VisitedPlaces,
    /// `fromDate`, `toDate`, `fromAge`, `toAge`, `gender`
    AverageMark,
}

impl FilterKeys {
    pub fn accepts(&self, key: &str) -> bool {
        match self {
            FilterKeys::VisitedPlaces => matches!(key, "fromDate" | "toDate" | "country" | "toDistance"),
            FilterKeys::AverageMark => matches!(key, "fromDate" | "toDate" | "fromAge" | "toAge" | "gender"),
        }
    }
}

/// Build a `Filter` from a raw query string, reading only the keys `keys`
/// accepts. When a key repeats, its first occurrence wins.
pub fn parse_filter(query: &str, keys: FilterKeys) -> Result<Filter> {
    let mut filter = Filter::new();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
        if !keys.accepts(key) {
            continue;
        }

        match key {
            "fromDate" if filter.from_date.is_none() => filter.from_date = Some(integer(key, raw)?),
            "toDate" if filter.to_date.is_none() => filter.to_date = Some(integer(key, raw)?),
            "fromAge" if filter.from_age.is_none() => filter.from_age = Some(integer(key, raw)?),
            "toAge" if filter.to_age.is_none() => filter.to_age = Some(integer(key, raw)?),
            "toDistance" if filter.to_distance.is_none() => filter.to_distance = Some(integer(key, raw)?),
            "gender" if filter.gender.is_none() => {
                let value = percent_decode(raw)?;
                let gender = Gender::parse(&value)
                    .ok_or_else(|| Error::invalid(format!("gender must be m or f, got {:?}", value)))?;
                filter.gender = Some(gender);
            }
            "country" if filter.country.is_none() => {
                let value = percent_decode(raw)?;
                if value.is_empty() || value.chars().count() > MAX_COUNTRY_CHARS {
                    return Err(Error::invalid("country must be 1 to 50 characters"));
                }
                filter = filter.with_country(&value);
            }
            _ => {}
        }
    }

    Ok(filter)
}

// Unsigned decimal digits only; a sign is rejected
fn integer(key: &str, raw: &str) -> Result<i64> {
    let value = percent_decode(raw)?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid(format!("{} must be digits only, got {:?}", key, value)));
    }
    value
        .parse::<i64>()
        .map_err(|_| Error::invalid(format!("{} is out of range: {}", key, value)))
}

/// Decode `%XX` escapes and `+` in a query component.
pub fn percent_decode(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let escape = bytes.get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| Error::invalid("bad percent escape"))?;
                out.push(escape);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|_| Error::invalid("query value is not UTF-8"))
}
