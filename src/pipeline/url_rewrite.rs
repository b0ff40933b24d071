//! URL rewrite templates.
//!
//! A template is a plain string with `$<part>` placeholders naming URL
//! components (`$<pathname>`, `$<origin>`, ...). Each placeholder also has
//! `_encode`/`_decode` variants for percent-encoding round trips, and `$$`
//! produces a literal dollar sign.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::app::{FreshetError, Result};

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$<([A-Za-z_]+)>|\$\$").expect("static pattern"))
}

/// Expand `template` against `url`. Unknown placeholders are a
/// `Transform` error rather than silently expanding to nothing.
pub fn url_replace(url: &Url, template: &str) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for captures in token_pattern().captures_iter(template) {
        let token = captures.get(0).expect("whole match");
        out.push_str(&template[last..token.start()]);
        last = token.end();

        match captures.get(1) {
            None => out.push('$'),
            Some(name) => out.push_str(&component(url, name.as_str())?),
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn component(url: &Url, name: &str) -> Result<String> {
    enum Coding {
        Plain,
        Encode,
        Decode,
    }

    let (base, coding) = if let Some(base) = name.strip_suffix("_encode") {
        (base, Coding::Encode)
    } else if let Some(base) = name.strip_suffix("_decode") {
        (base, Coding::Decode)
    } else {
        (name, Coding::Plain)
    };

    let value = match base {
        "href" => url.as_str().to_string(),
        "origin" => url.origin().ascii_serialization(),
        "protocol" => format!("{}:", url.scheme()),
        "username" => url.username().to_string(),
        "password" => url.password().unwrap_or_default().to_string(),
        "host" => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        },
        "hostname" => url.host_str().unwrap_or_default().to_string(),
        "port" => url.port().map(|p| p.to_string()).unwrap_or_default(),
        "pathname" => url.path().to_string(),
        "search" => url.query().map(|q| format!("?{q}")).unwrap_or_default(),
        "hash" => url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
        other => {
            return Err(FreshetError::Transform(format!(
                "unknown URL component $<{other}>"
            )))
        }
    };

    Ok(match coding {
        Coding::Plain => value,
        Coding::Encode => urlencoding::encode(&value).into_owned(),
        Coding::Decode => urlencoding::decode(&value)
            .map(|cow| cow.into_owned())
            .unwrap_or(value),
    })
}
