use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::session::{read_cookie, LANGUAGE_COOKIE};
use crate::i18n::SupportedLanguage;

/// Language detection middleware that stores the preference in request extensions
pub async fn language_middleware(mut request: Request, next: Next) -> Response {
    let language = detect_language(request.headers());
    request.extensions_mut().insert(language);
    next.run(request).await
}

/// Priority: `lang` cookie, then `X-Language`, then `Accept-Language`.
pub fn detect_language(headers: &HeaderMap) -> SupportedLanguage {
    if let Some(language) = read_cookie(headers, LANGUAGE_COOKIE)
        .and_then(|code| code.parse::<SupportedLanguage>().ok())
    {
        return language;
    }

    if let Some(lang_header) = headers.get("X-Language") {
        if let Ok(lang_str) = lang_header.to_str() {
            if let Ok(language) = lang_str.parse::<SupportedLanguage>() {
                return language;
            }
        }
    }

    if let Some(accept_language) = headers.get("Accept-Language") {
        if let Ok(accept_language_str) = accept_language.to_str() {
            return SupportedLanguage::from_accept_language(accept_language_str);
        }
    }

    SupportedLanguage::default()
}

/// Extension trait for extracting language from request
pub trait LanguageExtractor {
    fn get_language(&self) -> SupportedLanguage;
}

impl LanguageExtractor for Request {
    fn get_language(&self) -> SupportedLanguage {
        self.extensions()
            .get::<SupportedLanguage>()
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_wins_over_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("lang=en"));
        headers.insert("X-Language", HeaderValue::from_static("id"));
        headers.insert("Accept-Language", HeaderValue::from_static("id-ID"));
        assert_eq!(detect_language(&headers), SupportedLanguage::English);
    }

    #[test]
    fn explicit_header_wins_over_accept_language() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Language", HeaderValue::from_static("en"));
        headers.insert("Accept-Language", HeaderValue::from_static("id-ID"));
        assert_eq!(detect_language(&headers), SupportedLanguage::English);
    }

    #[test]
    fn unknown_cookie_value_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("lang=xx"));
        headers.insert("Accept-Language", HeaderValue::from_static("en-GB"));
        assert_eq!(detect_language(&headers), SupportedLanguage::English);
    }

    #[test]
    fn defaults_to_indonesian() {
        assert_eq!(detect_language(&HeaderMap::new()), SupportedLanguage::Indonesian);
    }
}
