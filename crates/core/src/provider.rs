use std::{fmt, process::Stdio};

use tokio::process::Command;

use crate::{
    cache::dir_has_entries,
    config::{OPENAI_API_KEY_ENV, ProviderEnv},
    error::{HeroldError, Result},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TtsProvider {
    Kokoro,
    Piper,
    Coqui,
    Openai,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Local,
    Cloud,
}

pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub default_voice: &'static str,
    pub voices: &'static [&'static str],
    pub install_hint: &'static str,
}

impl TtsProvider {
    /// Providers in the order they are tried when none is requested.
    pub const PREFERENCE: [TtsProvider; 4] = [
        TtsProvider::Kokoro,
        TtsProvider::Piper,
        TtsProvider::Coqui,
        TtsProvider::Openai,
    ];

    pub fn config(&self) -> ProviderConfig {
        match self {
            TtsProvider::Kokoro => ProviderConfig {
                kind: ProviderKind::Local,
                default_voice: "af_bella",
                voices: &["af_bella", "af_sarah", "am_adam", "bf_emma", "bm_george"],
                install_hint: "npm install kokoro-js && herold download-models",
            },
            TtsProvider::Piper => ProviderConfig {
                kind: ProviderKind::Local,
                default_voice: "en_US-lessac-medium",
                voices: &[
                    "en_US-amy-medium",
                    "en_US-bryce-medium",
                    "en_US-lessac-medium",
                    "en_US-libritts-high",
                    "en_US-ljspeech-high",
                ],
                install_hint: "pip install piper-tts, then place voices in ~/.local/piper-voices",
            },
            TtsProvider::Coqui => ProviderConfig {
                kind: ProviderKind::Local,
                default_voice: "glow-tts",
                voices: &["default", "glow-tts", "tacotron2", "glow-tts-de"],
                install_hint: "pip install TTS",
            },
            TtsProvider::Openai => ProviderConfig {
                kind: ProviderKind::Cloud,
                default_voice: "onyx",
                voices: &["alloy", "echo", "fable", "onyx", "nova", "shimmer"],
                install_hint: "export OPENAI_API_KEY=sk-...",
            },
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            TtsProvider::Kokoro => "kokoro",
            TtsProvider::Piper => "piper",
            TtsProvider::Coqui => "coqui",
            TtsProvider::Openai => "openai",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TtsProvider::Kokoro => "Kokoro JS",
            TtsProvider::Piper => "Piper",
            TtsProvider::Coqui => "Coqui TTS",
            TtsProvider::Openai => "OpenAI",
        }
    }

    /// Parse a provider id, case-insensitively
    pub fn parse(name: &str) -> Result<Self> {
        let wanted = name.trim().to_lowercase();
        Self::PREFERENCE
            .into_iter()
            .find(|provider| provider.id() == wanted)
            .ok_or_else(|| HeroldError::UnknownProvider {
                name: name.to_string(),
                available: Self::known_ids(),
            })
    }

    pub fn known_ids() -> String {
        Self::PREFERENCE
            .iter()
            .map(|provider| provider.id())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[allow(async_fn_in_trait)]
pub trait AvailabilityProbe {
    /// Observe whether a provider is usable. "Not installed" is `false`, never an error.
    async fn is_available(&self, provider: TtsProvider) -> bool;
}

/// Probes the real machine: runtimes, binaries, caches and credentials.
pub struct SystemProbe<'a> {
    env: &'a ProviderEnv,
}

impl<'a> SystemProbe<'a> {
    pub fn new(env: &'a ProviderEnv) -> Self {
        Self { env }
    }

    async fn command_succeeds(program: &str, args: &[&str]) -> bool {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        matches!(status, Ok(status) if status.success())
    }
}

impl AvailabilityProbe for SystemProbe<'_> {
    async fn is_available(&self, provider: TtsProvider) -> bool {
        let available = match provider {
            TtsProvider::Kokoro => {
                dir_has_entries(&self.env.kokoro_model_dir)
                    && Self::command_succeeds(
                        &self.env.node_bin,
                        &["-e", "require.resolve('kokoro-js')"],
                    )
                    .await
            }
            TtsProvider::Piper => self.env.find_executable("piper").is_some(),
            TtsProvider::Coqui => {
                Self::command_succeeds(&self.env.python_bin, &["-c", "import TTS"]).await
            }
            TtsProvider::Openai => self.env.openai_api_key.is_some(),
        };
        tracing::debug!(provider = provider.id(), available, "probed provider");
        available
    }
}

fn install_hints() -> String {
    TtsProvider::PREFERENCE
        .iter()
        .map(|provider| format!("   {}: {}", provider.name(), provider.config().install_hint))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pick the TTS backend for this run.
///
/// An explicit request must name a known provider that passes its probe.
/// Otherwise the first available provider in preference order wins.
pub async fn resolve_provider(
    requested: Option<&str>,
    probe: &impl AvailabilityProbe,
) -> Result<TtsProvider> {
    if let Some(name) = requested {
        let provider = TtsProvider::parse(name)?;
        if !probe.is_available(provider).await {
            let hint = match provider {
                TtsProvider::Openai => format!("Set {}.", OPENAI_API_KEY_ENV),
                _ => format!("Install with: {}", provider.config().install_hint),
            };
            return Err(HeroldError::ProviderUnavailable {
                name: provider.id().to_string(),
                hint,
            });
        }
        return Ok(provider);
    }

    for provider in TtsProvider::PREFERENCE {
        if probe.is_available(provider).await {
            return Ok(provider);
        }
    }

    Err(HeroldError::NoProviderAvailable {
        hints: install_hints(),
    })
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashSet};

    use super::*;

    struct FakeProbe {
        available: HashSet<TtsProvider>,
        probed: RefCell<Vec<TtsProvider>>,
    }

    impl FakeProbe {
        fn with(available: &[TtsProvider]) -> Self {
            Self {
                available: available.iter().copied().collect(),
                probed: RefCell::new(Vec::new()),
            }
        }
    }

    impl AvailabilityProbe for FakeProbe {
        async fn is_available(&self, provider: TtsProvider) -> bool {
            self.probed.borrow_mut().push(provider);
            self.available.contains(&provider)
        }
    }

    #[tokio::test]
    async fn unknown_provider_fails_before_probing() {
        let probe = FakeProbe::with(&TtsProvider::PREFERENCE);
        let err = resolve_provider(Some("mumble"), &probe).await.unwrap_err();

        assert!(matches!(err, HeroldError::UnknownProvider { ref name, .. } if name == "mumble"));
        assert!(probe.probed.borrow().is_empty());
    }

    #[tokio::test]
    async fn requested_provider_must_be_available() {
        let probe = FakeProbe::with(&[TtsProvider::Kokoro]);
        let err = resolve_provider(Some("piper"), &probe).await.unwrap_err();
        assert!(matches!(err, HeroldError::ProviderUnavailable { .. }));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn requested_name_is_case_insensitive() {
        let probe = FakeProbe::with(&[TtsProvider::Openai]);
        let provider = resolve_provider(Some("OpenAI"), &probe).await.unwrap();
        assert_eq!(provider, TtsProvider::Openai);
    }

    #[tokio::test]
    async fn falls_back_in_preference_order() {
        let probe = FakeProbe::with(&[TtsProvider::Openai, TtsProvider::Coqui]);
        let provider = resolve_provider(None, &probe).await.unwrap();

        assert_eq!(provider, TtsProvider::Coqui);
        assert_eq!(
            *probe.probed.borrow(),
            [TtsProvider::Kokoro, TtsProvider::Piper, TtsProvider::Coqui]
        );
    }

    #[tokio::test]
    async fn nothing_available_lists_install_hints() {
        let probe = FakeProbe::with(&[]);
        let err = resolve_provider(None, &probe).await.unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, HeroldError::NoProviderAvailable { .. }));
        assert!(message.contains("pip install piper-tts"));
        assert!(message.contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn system_probe_reads_explicit_env() {
        let env = ProviderEnv {
            openai_api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let probe = SystemProbe::new(&env);
        assert!(probe.is_available(TtsProvider::Openai).await);
        assert!(!probe.is_available(TtsProvider::Piper).await);
    }
}
