use tracing::error;
use crate::api::handlers::Api;
use crate::core::types::Id;
use crate::server::http::{Method, Reply, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    AverageMark(Id),
    VisitedPlaces(Id),
    GetUser(Id),
    GetLocation(Id),
    GetVisit(Id),
    CreateUser,
    CreateLocation,
    CreateVisit,
    UpdateUser(Id),
    UpdateLocation(Id),
    UpdateVisit(Id),
}

#[derive(Debug, Clone, Copy)]
enum Segment {
    Literal(&'static str),
    Id,
}

struct Route {
    method: Method,
    pattern: &'static [Segment],
    endpoint: fn(Id) -> Endpoint,
}

use Segment::{Id as IdSegment, Literal};

/// Ordered route table. Longer patterns sharing a prefix come first.
const ROUTES: &[Route] = &[
    Route { method: Method::Get, pattern: &[Literal("locations"), IdSegment, Literal("avg")], endpoint: Endpoint::AverageMark },
    Route { method: Method::Get, pattern: &[Literal("users"), IdSegment, Literal("visits")], endpoint: Endpoint::VisitedPlaces },
    Route { method: Method::Get, pattern: &[Literal("users"), IdSegment], endpoint: Endpoint::GetUser },
    Route { method: Method::Get, pattern: &[Literal("locations"), IdSegment], endpoint: Endpoint::GetLocation },
    Route { method: Method::Get, pattern: &[Literal("visits"), IdSegment], endpoint: Endpoint::GetVisit },
    Route { method: Method::Post, pattern: &[Literal("users"), Literal("new")], endpoint: |_| Endpoint::CreateUser },
    Route { method: Method::Post, pattern: &[Literal("locations"), Literal("new")], endpoint: |_| Endpoint::CreateLocation },
    Route { method: Method::Post, pattern: &[Literal("visits"), Literal("new")], endpoint: |_| Endpoint::CreateVisit },
    Route { method: Method::Post, pattern: &[Literal("users"), IdSegment], endpoint: Endpoint::UpdateUser },
    Route { method: Method::Post, pattern: &[Literal("locations"), IdSegment], endpoint: Endpoint::UpdateLocation },
    Route { method: Method::Post, pattern: &[Literal("visits"), IdSegment], endpoint: Endpoint::UpdateVisit },
];

/// First route in table order matching `method` and `path`.
pub fn resolve(method: Method, path: &str) -> Option<Endpoint> {
    let rest = path.strip_prefix('/')?;
    ROUTES
        .iter()
        .filter(|route| route.method == method)
        .find_map(|route| match_pattern(route.pattern, rest).map(route.endpoint))
}

fn match_pattern(pattern: &[Segment], path: &str) -> Option<Id> {
    let mut parts = path.split('/');
    let mut id = 0;

    for segment in pattern {
        let part = parts.next()?;
        match segment {
            Segment::Literal(literal) => {
                if part != *literal {
                    return None;
                }
            }
            Segment::Id => {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                id = part.parse::<Id>().ok()?;
            }
        }
    }

    match parts.next() {
        None => Some(id),
        Some(_) => None,
    }
}

/// Maps one request to exactly one handler call.
pub struct Router {
    pub api: Api,
}

impl Router {
    pub fn new(api: Api) -> Self {
        Router { api }
    }

    pub fn dispatch(&self, request: &Request<'_>) -> Reply {
        let Some(endpoint) = resolve(request.method, request.path) else {
            return Reply::not_found();
        };

        let api = &self.api;
        let result = match endpoint {
            Endpoint::AverageMark(id) => api.average_mark(id, request.query),
            Endpoint::VisitedPlaces(id) => api.visited_places(id, request.query),
            Endpoint::GetUser(id) => api.get_user(id),
            Endpoint::GetLocation(id) => api.get_location(id),
            Endpoint::GetVisit(id) => api.get_visit(id),
            Endpoint::CreateUser => api.create_user(request.body),
            Endpoint::CreateLocation => api.create_location(request.body),
            Endpoint::CreateVisit => api.create_visit(request.body),
            Endpoint::UpdateUser(id) => api.update_user(id, request.body),
            Endpoint::UpdateLocation(id) => api.update_location(id, request.body),
            Endpoint::UpdateVisit(id) => api.update_visit(id, request.body),
        };

        match result {
            Ok(body) => Reply::ok(body),
            Err(err) => {
                if err.kind.status_code() >= 500 {
                    error!(path = request.path, error = %err, "Request failed");
                }
                Reply::from_error(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_routes_win() {
        assert_eq!(resolve(Method::Get, "/users/7/visits"), Some(Endpoint::VisitedPlaces(7)));
        assert_eq!(resolve(Method::Get, "/users/7"), Some(Endpoint::GetUser(7)));
        assert_eq!(resolve(Method::Get, "/locations/3/avg"), Some(Endpoint::AverageMark(3)));
        assert_eq!(resolve(Method::Post, "/locations/new"), Some(Endpoint::CreateLocation));
        assert_eq!(resolve(Method::Post, "/locations/3"), Some(Endpoint::UpdateLocation(3)));
    }

    #[test]
    fn test_unmatched_paths() {
        assert_eq!(resolve(Method::Get, "/users/-1"), None);
        assert_eq!(resolve(Method::Get, "/users/99999999999"), None);
        assert_eq!(resolve(Method::Get, "/users/7/"), None);
        assert_eq!(resolve(Method::Post, "/users/7/visits"), None);
        assert_eq!(resolve(Method::Get, "users/7"), None);
    }
}
