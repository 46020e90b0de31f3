//! Decoding of raw request targets.
//!
//! A target is split as sent: the path is never normalised or resolved, so
//! `/x/../mcpi/...` and relative `mcpi/...` keep paths no route matches.
//! Absolute-form targets (`http://host/path?query`) are checked with the
//! `url` crate and their path taken verbatim.

use std::collections::HashMap;

use url::{form_urlencoded, Url};

/// Query parameters, each name mapping to all of its values in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, Vec<String>>);

impl QueryParams {
    /// First value given for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A request target split into path and decoded query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTarget {
    /// Path as sent, still percent-encoded.
    pub path: String,
    pub query: QueryParams,
}

/// Split `target` into path and query parameters.
///
/// Query values are percent- and `+`-decoded. Parameters with an empty value
/// are dropped.
pub fn decode_target(target: &str) -> Result<DecodedTarget, url::ParseError> {
    let origin_form = match absolute_form_authority_len(target) {
        Some(skip) => {
            Url::parse(target)?;
            let rest = &target[skip..];
            &rest[rest.find(['/', '?', '#']).unwrap_or(rest.len())..]
        }
        None => target,
    };

    let without_fragment = origin_form.split('#').next().unwrap_or_default();
    let (path, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        params
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    Ok(DecodedTarget {
        path: path.to_string(),
        query: QueryParams(params),
    })
}

/// Length of the `scheme://` lead-in of an absolute-form target.
fn absolute_form_authority_len(target: &str) -> Option<usize> {
    ["http://", "https://"]
        .into_iter()
        .find(|scheme| {
            target
                .get(..scheme.len())
                .is_some_and(|lead| lead.eq_ignore_ascii_case(scheme))
        })
        .map(str::len)
}
