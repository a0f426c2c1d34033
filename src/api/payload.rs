use serde_json::{Map, Value};
use crate::core::error::{Error, Result};
use crate::core::types::{Gender, Id, Location, User, Visit};
use crate::storage::patch::{LocationPatch, UserPatch, VisitPatch};

const MAX_EMAIL_CHARS: usize = 100;
const MAX_NAME_CHARS: usize = 50;

type Object = Map<String, Value>;

pub fn new_user(body: &[u8]) -> Result<User> {
    let object = parse_object(body)?;
    Ok(User {
        id: id(required(&object, "id")?, "id")?,
        email: text(required(&object, "email")?, "email", MAX_EMAIL_CHARS)?,
        first_name: text(required(&object, "first_name")?, "first_name", MAX_NAME_CHARS)?,
        last_name: text(required(&object, "last_name")?, "last_name", MAX_NAME_CHARS)?,
        gender: gender(required(&object, "gender")?)?,
        birth_date: integer(required(&object, "birth_date")?, "birth_date")?,
    })
}

pub fn user_patch(body: &[u8]) -> Result<UserPatch> {
    let object = parse_object(body)?;
    Ok(UserPatch {
        email: object.get("email").map(|v| text(v, "email", MAX_EMAIL_CHARS)).transpose()?,
        first_name: object.get("first_name").map(|v| text(v, "first_name", MAX_NAME_CHARS)).transpose()?,
        last_name: object.get("last_name").map(|v| text(v, "last_name", MAX_NAME_CHARS)).transpose()?,
        gender: object.get("gender").map(gender).transpose()?,
        birth_date: object.get("birth_date").map(|v| integer(v, "birth_date")).transpose()?,
    })
}

pub fn new_location(body: &[u8]) -> Result<Location> {
    let object = parse_object(body)?;
    Ok(Location {
        id: id(required(&object, "id")?, "id")?,
        place: text(required(&object, "place")?, "place", usize::MAX)?,
        country: text(required(&object, "country")?, "country", MAX_NAME_CHARS)?,
        city: text(required(&object, "city")?, "city", MAX_NAME_CHARS)?,
        distance: distance(required(&object, "distance")?)?,
    })
}

pub fn location_patch(body: &[u8]) -> Result<LocationPatch> {
    let object = parse_object(body)?;
    Ok(LocationPatch {
        place: object.get("place").map(|v| text(v, "place", usize::MAX)).transpose()?,
        country: object.get("country").map(|v| text(v, "country", MAX_NAME_CHARS)).transpose()?,
        city: object.get("city").map(|v| text(v, "city", MAX_NAME_CHARS)).transpose()?,
        distance: object.get("distance").map(distance).transpose()?,
    })
}

pub fn new_visit(body: &[u8]) -> Result<Visit> {
    let object = parse_object(body)?;
    Ok(Visit {
        id: id(required(&object, "id")?, "id")?,
        location: id(required(&object, "location")?, "location")?,
        user: id(required(&object, "user")?, "user")?,
        visited_at: integer(required(&object, "visited_at")?, "visited_at")?,
        mark: mark(required(&object, "mark")?)?,
    })
}

pub fn visit_patch(body: &[u8]) -> Result<VisitPatch> {
    let object = parse_object(body)?;
    Ok(VisitPatch {
        location: object.get("location").map(|v| id(v, "location")).transpose()?,
        user: object.get("user").map(|v| id(v, "user")).transpose()?,
        visited_at: object.get("visited_at").map(|v| integer(v, "visited_at")).transpose()?,
        mark: object.get("mark").map(mark).transpose()?,
    })
}

fn parse_object(body: &[u8]) -> Result<Object> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(Error::invalid("body must be a JSON object")),
        Err(e) => Err(Error::invalid(format!("body is not JSON: {}", e))),
    }
}

fn required<'a>(object: &'a Object, field: &str) -> Result<&'a Value> {
    object.get(field).ok_or_else(|| Error::invalid(format!("{} is required", field)))
}

// A present `null` fails every check below, matching a wrong type.

fn id(value: &Value, field: &str) -> Result<Id> {
    value
        .as_u64()
        .and_then(|n| Id::try_from(n).ok())
        .ok_or_else(|| Error::invalid(format!("{} must be a non-negative id", field)))
}

fn integer(value: &Value, field: &str) -> Result<i64> {
    value.as_i64().ok_or_else(|| Error::invalid(format!("{} must be an integer", field)))
}

fn text(value: &Value, field: &str, max_chars: usize) -> Result<String> {
    let text = value.as_str().ok_or_else(|| Error::invalid(format!("{} must be a string", field)))?;
    if text.chars().count() > max_chars {
        return Err(Error::invalid(format!("{} exceeds {} characters", field, max_chars)));
    }
    Ok(text.to_string())
}

fn gender(value: &Value) -> Result<Gender> {
    value
        .as_str()
        .and_then(Gender::parse)
        .ok_or_else(|| Error::invalid("gender must be m or f"))
}

fn distance(value: &Value) -> Result<u32> {
    value
        .as_u64()
        .filter(|&d| d > 0)
        .and_then(|d| u32::try_from(d).ok())
        .ok_or_else(|| Error::invalid("distance must be a positive integer"))
}

fn mark(value: &Value) -> Result<u8> {
    value
        .as_u64()
        .filter(|&m| m <= 5)
        .map(|m| m as u8)
        .ok_or_else(|| Error::invalid("mark must be between 0 and 5"))
}
