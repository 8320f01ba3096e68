/*
 * Responsibility
 * - The resolved identity of one request (Principal) and the scheme that produced it
 * - Built fresh per request, never persisted
 */
use serde::Serialize;

use super::claims::{Claim, claim_types};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    Token,
    Cookie,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    claims: Vec<Claim>,
    scheme: Scheme,
}

impl Principal {
    pub fn new(claims: Vec<Claim>, scheme: Scheme) -> Self {
        Self { claims, scheme }
    }

    pub fn anonymous() -> Self {
        Self {
            claims: Vec::new(),
            scheme: Scheme::Anonymous,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn is_authenticated(&self) -> bool {
        self.scheme != Scheme::Anonymous
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// First value of the given claim type.
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// All values of the given claim type, in claim order.
    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.find_first(claim_types::NAME)
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.find_all(claim_types::ROLE).any(|r| r == role)
    }
}
