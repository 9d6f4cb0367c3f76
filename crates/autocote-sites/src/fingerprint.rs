//! Randomized browser identity sent with marketplace requests.

use rand::Rng;

/// Request headers that make a search look like it came from a desktop browser.
#[derive(Debug, Clone)]
pub struct BrowserFingerprint {
    /// Desktop `User-Agent` header
    pub user_agent: String,
    /// French-first `Accept-Language` header
    pub accept_language: String,
}

impl BrowserFingerprint {
    /// Pick a random desktop browser identity.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        // Recent desktop browsers
        let user_agents = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:130.0) Gecko/20100101 Firefox/130.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
        ];

        let languages = ["fr-FR,fr;q=0.9,en;q=0.8", "fr-FR,fr;q=0.9", "fr,en-US;q=0.7,en;q=0.3"];

        let ua_idx = rng.gen_range(0..user_agents.len());
        let lang_idx = rng.gen_range(0..languages.len());

        Self {
            user_agent: user_agents[ua_idx].to_string(),
            accept_language: languages[lang_idx].to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_randomized_fingerprint() {
        let fingerprint = BrowserFingerprint::randomized();
        assert!(fingerprint.user_agent.starts_with("Mozilla/5.0"));
        assert!(fingerprint.accept_language.starts_with("fr"));
    }

    #[test]
    fn test_fingerprint_variation() {
        // Probabilistic, 20 draws over 5 agents
        let fingerprints: Vec<_> = (0..20).map(|_| BrowserFingerprint::randomized()).collect();

        let first_ua = &fingerprints[0].user_agent;
        let all_same = fingerprints.iter().all(|f| &f.user_agent == first_ua);
        assert!(!all_same, "Expected variation in user agents");
    }
}
