//! `key=value;key=value` parameter strings.
//!
//! Import requests and data-source descriptors share this format. Values may be
//! wrapped in double quotes to carry `;` or surrounding whitespace. Values never
//! contain `"`. Keys compare without regard
//! to ASCII case, and insertion order is kept so a descriptor renders the way it
//! was written.

use indexmap::IndexMap;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::multispace0;
use nom::combinator::{all_consuming, map, opt};
use nom::error::{context, convert_error, VerboseError};
use nom::multi::separated_list0;
use nom::sequence::{delimited, preceded, separated_pair, terminated};
use std::fmt;
use thiserror::Error;

type IResult<I, O> = nom::IResult<I, O, VerboseError<I>>;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed parameters: {0}")]
pub struct ParamsError(String);

impl ParamsError {
    pub(crate) fn invalid(key: &str, value: &str) -> Self {
        ParamsError(format!("{key} expects true or false, got {value:?}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(IndexMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self, ParamsError> {
        match all_consuming(parameters)(input) {
            Ok((_, pairs)) => {
                let mut params = Self::new();
                for (key, value) in pairs {
                    params.insert(key, value);
                }
                Ok(params)
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(ParamsError(convert_error(input, e)))
            }
            Err(nom::Err::Incomplete(_)) => Err(ParamsError("incomplete input".to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.find(key).map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Reads a boolean directive; `None` when absent or not `true`/`false`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|value| match value.trim() {
            v if v.eq_ignore_ascii_case("true") => Some(true),
            v if v.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        })
    }

    /// Inserts or replaces. A replaced key keeps its original spelling and position.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.find_key(&key) {
            Some(existing) => {
                self.0.insert(existing, value);
            }
            None => {
                self.0.insert(key, value);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let existing = self.find_key(key)?;
        self.0.shift_remove(&existing)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn find(&self, key: &str) -> Option<(&String, &String)> {
        self.0.iter().find(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    fn find_key(&self, key: &str) -> Option<String> {
        self.find(key).map(|(k, _)| k.clone())
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            if needs_quotes(value) {
                write!(f, "{key}=\"{value}\"")?;
            } else {
                write!(f, "{key}={value}")?;
            }
        }
        Ok(())
    }
}

fn parameters(i: &str) -> IResult<&str, Vec<(String, String)>> {
    context(
        "parameters",
        delimited(
            multispace0,
            terminated(
                separated_list0(preceded(multispace0, tag(";")), pair),
                opt(preceded(multispace0, tag(";"))),
            ),
            multispace0,
        ),
    )(i)
}

fn pair(i: &str) -> IResult<&str, (String, String)> {
    context(
        "pair",
        map(
            separated_pair(
                preceded(multispace0, key),
                delimited(multispace0, tag("="), multispace0),
                alt((quoted, bare)),
            ),
            |(key, value)| (key.to_string(), value),
        ),
    )(i)
}

fn key(i: &str) -> IResult<&str, &str> {
    context("key", take_while1(is_key))(i)
}

fn quoted(i: &str) -> IResult<&str, String> {
    context(
        "quoted value",
        map(
            delimited(tag("\""), take_while(|c| c != '"'), tag("\"")),
            |value: &str| value.to_string(),
        ),
    )(i)
}

fn bare(i: &str) -> IResult<&str, String> {
    context(
        "value",
        map(take_while(|c| c != ';' && c != '"'), |value: &str| {
            value.trim().to_string()
        }),
    )(i)
}

fn needs_quotes(value: &str) -> bool {
    value.contains(';') || value.trim() != value
}

fn is_key(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let params =
            Parameters::parse("overwrite=true; xmlaEnabledFlag = false;DataSource=\"a;b\";").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params.flag("overwrite"), Some(true));
        assert_eq!(params.flag("XMLAENABLEDFLAG"), Some(false));
        assert_eq!(params.get("datasource"), Some("a;b"));
        assert_eq!(params.flag("missing"), None);
    }

    #[test]
    fn empty() {
        assert!(Parameters::parse("").unwrap().is_empty());
        assert!(Parameters::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn malformed() {
        assert!(Parameters::parse("=value").is_err());
        assert!(Parameters::parse("key").is_err());
        assert!(Parameters::parse("a=1;;b=2").is_err());
        assert!(Parameters::parse("a=x\"y").is_err());
        assert!(Parameters::parse("a=\"x\"y\"").is_err());
    }

    #[test]
    fn display_reparses() {
        let mut params = Parameters::new();
        params.insert("DataSource", "a;b");
        params.insert("Catalog", " padded ");
        params.insert("Provider", "mondrian");
        params.insert("Empty", "");
        let text = params.to_string();
        assert_eq!(
            text,
            "DataSource=\"a;b\";Catalog=\" padded \";Provider=mondrian;Empty="
        );
        assert_eq!(Parameters::parse(&text).unwrap(), params);
    }

    #[test]
    fn insert_keeps_spelling_and_order() {
        let mut params = Parameters::parse("Provider=mondrian;DataSource=sales").unwrap();
        params.insert("datasource", "hr");
        params.insert("EnableXmla", "true");
        assert_eq!(
            params.to_string(),
            "Provider=mondrian;DataSource=hr;EnableXmla=true"
        );
        assert_eq!(params.remove("PROVIDER"), Some("mondrian".to_string()));
        assert_eq!(params.to_string(), "DataSource=hr;EnableXmla=true");
    }
}
