//! Spectrum to document conversion.
//!
//! Every m/z value is rendered with a fixed number of decimals and prefixed
//! with its origin, `peak@71.05` or `loss@18.01`. Rounding is done by the
//! float formatter, on the exact binary value of the `f64`, with ties going
//! to the even digit. This is the same rendering as printf-style `%.2f`.

use crate::models::{
    Document,
    Spectrum,
    TokenKind,
};

/// Default number of decimals kept when turning m/z values into words.
pub const DEFAULT_N_DECIMALS: usize = 2;

/// Formats a single token, eg. `format_token(TokenKind::Peak, 71.0497, 2) == "peak@71.05"`.
pub fn format_token(kind: TokenKind, mz: f64, n_decimals: usize) -> String {
    format!("{}{:.*}", kind.prefix(), n_decimals, mz)
}

/// Converts a spectrum into its document: one token per peak, then one
/// token per loss.
pub fn tokenize(spectrum: &Spectrum, n_decimals: usize) -> Document {
    let peaks = spectrum
        .peaks
        .iter()
        .map(|(mz, _)| format_token(TokenKind::Peak, *mz, n_decimals));
    let losses = spectrum
        .losses
        .iter()
        .map(|(mz, _)| format_token(TokenKind::Loss, *mz, n_decimals));
    peaks.chain(losses).collect()
}

/// Splits a token back into its kind and numeric value.
///
/// Returns `None` for anything that is not `peak@<number>` or `loss@<number>`.
pub fn parse_token(token: &str) -> Option<(TokenKind, f64)> {
    let (kind, value) = if let Some(rest) = token.strip_prefix(TokenKind::Peak.prefix()) {
        (TokenKind::Peak, rest)
    } else if let Some(rest) = token.strip_prefix(TokenKind::Loss.prefix()) {
        (TokenKind::Loss, rest)
    } else {
        return None;
    };
    // Reject things like "inf", "1e3" or "+5" that f64::from_str would take.
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    value.parse::<f64>().ok().map(|v| (kind, v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_token_shape(token: &str, n_decimals: usize) -> bool {
        let pattern = if n_decimals == 0 {
            r"^(peak|loss)@-?\d+$".to_string()
        } else {
            format!(r"^(peak|loss)@-?\d+\.\d{{{}}}$", n_decimals)
        };
        regex::Regex::new(&pattern).unwrap().is_match(token)
    }

    #[test]
    fn test_tokenize_sample() {
        let doc = tokenize(&Spectrum::sample(), 2);
        assert_eq!(
            doc.words(),
            &[
                "peak@71.05",
                "peak@85.07",
                "peak@99.08",
                "loss@18.01",
                "loss@45.00",
            ]
        );
    }

    #[test]
    fn test_trailing_zeros_are_kept() {
        assert_eq!(format_token(TokenKind::Peak, 100.0, 2), "peak@100.00");
        assert_eq!(format_token(TokenKind::Loss, 50.5, 4), "loss@50.5000");
        assert_eq!(format_token(TokenKind::Peak, 71.4, 0), "peak@71");
    }

    #[test]
    fn test_duplicates_are_not_collapsed() {
        let spec = Spectrum::new("3", 200.0, vec![(100.001, 1.0), (99.999, 0.5)], vec![]);
        let doc = tokenize(&spec, 2);
        assert_eq!(doc.words(), &["peak@100.00", "peak@100.00"]);
    }

    #[test]
    fn test_empty_spectrum_gives_empty_document() {
        let spec = Spectrum::new("3", 200.0, vec![], vec![]);
        assert!(tokenize(&spec, 2).is_empty());
    }

    #[test]
    fn test_tokens_parse_back_to_rounded_values() {
        let peaks: Vec<(f64, f64)> = (0..200)
            .map(|i| (50.0 + i as f64 * 3.14159, 1.0))
            .collect();
        let losses: Vec<(f64, f64)> = (0..50).map(|i| (10.0 + i as f64 * 1.7321, 1.0)).collect();
        let spec = Spectrum::new("7", 500.0, peaks.clone(), losses.clone());

        for n_decimals in 0..5 {
            let doc = tokenize(&spec, n_decimals);
            assert_eq!(doc.len(), peaks.len() + losses.len());
            let originals = peaks.iter().chain(losses.iter()).map(|(mz, _)| *mz);
            let scale = 10f64.powi(n_decimals as i32);
            for (token, mz) in doc.iter().zip(originals) {
                assert!(matches_token_shape(token, n_decimals), "{}", token);
                let (_, value) = parse_token(token).unwrap();
                assert!(
                    (value - mz).abs() <= 0.5 / scale + 1e-9,
                    "{} from {}",
                    value,
                    mz
                );
            }
        }
    }

    #[test]
    fn test_exact_ties_round_to_even() {
        // Exactly representable halfway values.
        assert_eq!(format_token(TokenKind::Peak, 0.125, 2), "peak@0.12");
        assert_eq!(format_token(TokenKind::Peak, 0.375, 2), "peak@0.38");
        assert_eq!(format_token(TokenKind::Loss, 2.5, 0), "loss@2");
        // 207.0795 is stored slightly below the halfway point.
        assert_eq!(format_token(TokenKind::Peak, 207.0795, 3), "peak@207.079");
    }

    #[test]
    fn test_parse_token() {
        assert_eq!(parse_token("peak@71.05"), Some((TokenKind::Peak, 71.05)));
        assert_eq!(parse_token("loss@-0.50"), Some((TokenKind::Loss, -0.5)));
        assert_eq!(parse_token("peak@"), None);
        assert_eq!(parse_token("peak@inf"), None);
        assert_eq!(parse_token("frag@1.00"), None);
    }

    #[test]
    fn test_tokenize_is_deterministic() {
        let spec = Spectrum::sample();
        assert_eq!(tokenize(&spec, 3), tokenize(&spec, 3));
    }
}
