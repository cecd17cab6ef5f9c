use std::{
    path::{Path, PathBuf},
    process::{Output, Stdio},
};

use tokio::{fs, io::AsyncWriteExt, process::Command};

use crate::{
    config::{OPENAI_API_KEY_ENV, ProviderEnv},
    error::{HeroldError, Result},
    provider::TtsProvider,
};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const OPENAI_TTS_MODEL: &str = "tts-1";

const KOKORO_SCRIPT: &str = r#"
const fs = require('fs');
const Kokoro = require('kokoro-js');
const [modelDir, voice, outPath] = process.argv.slice(1);
let text = '';
process.stdin.on('data', (chunk) => (text += chunk));
process.stdin.on('end', async () => {
  try {
    const kokoro = new Kokoro({ modelDir });
    const audio = await kokoro.synthesize(text, voice);
    fs.writeFileSync(outPath, audio);
  } catch (err) {
    console.error(err.message);
    process.exit(1);
  }
});
"#;

const COQUI_SCRIPT: &str = r#"
import sys
from TTS.api import TTS
text = sys.stdin.read()
tts = TTS(model_name=sys.argv[1], progress_bar=False, gpu=False)
tts.tts_to_file(text=text, file_path=sys.argv[2])
"#;

/// Turns one narration segment into one audio file in the output directory.
#[allow(async_fn_in_trait)]
pub trait Synthesizer {
    fn provider_name(&self) -> &str;

    async fn synthesize(&self, text: &str, filename: &str, voice: &str) -> Result<PathBuf>;
}

/// Normalize typographic dashes and escape double quotes for the cloud API
pub fn clean_cloud_text(text: &str) -> String {
    text.replace(['\u{2014}', '\u{2013}'], "-")
        .replace('"', "\\\"")
}

fn truncate_reason(reason: &str, max_chars: usize) -> String {
    let reason = reason.trim();
    match reason.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &reason[..idx]),
        None => reason.to_string(),
    }
}

async fn run_with_stdin(mut command: Command, input: &str) -> std::io::Result<Output> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).await?;
        // dropping stdin closes the pipe so the child sees EOF
    }

    child.wait_with_output().await
}

/// Synthesizer for whichever provider the resolver picked
pub struct ProviderSynthesizer {
    provider: TtsProvider,
    env: ProviderEnv,
    output_dir: PathBuf,
    client: reqwest::Client,
}

impl ProviderSynthesizer {
    pub fn new(provider: TtsProvider, env: ProviderEnv, output_dir: &Path) -> Self {
        Self {
            provider,
            env,
            output_dir: output_dir.to_path_buf(),
            client: reqwest::Client::new(),
        }
    }

    fn failed(&self, filename: &str, reason: impl AsRef<str>) -> HeroldError {
        HeroldError::SynthesisFailed {
            provider: self.provider.name().to_string(),
            filename: filename.to_string(),
            reason: truncate_reason(reason.as_ref(), 200),
        }
    }

    /// Run a local tool and discard whatever it left behind if it fails
    async fn run_local(
        &self,
        command: Command,
        text: &str,
        filename: &str,
        filepath: &Path,
    ) -> Result<()> {
        tracing::debug!(provider = self.provider.id(), filename, "spawning local synthesizer");
        let outcome = run_with_stdin(command, text).await;

        let reason = match outcome {
            Ok(output) if output.status.success() && filepath.exists() => return Ok(()),
            Ok(output) if output.status.success() => "no audio file was written".to_string(),
            Ok(output) => String::from_utf8_lossy(&output.stderr).to_string(),
            Err(e) => e.to_string(),
        };

        if filepath.exists() {
            let _ = fs::remove_file(filepath).await;
        }
        Err(self.failed(filename, reason))
    }

    async fn synthesize_piper(
        &self,
        text: &str,
        filename: &str,
        voice: &str,
        filepath: &Path,
    ) -> Result<()> {
        let model_path = self.env.piper_voice_dir.join(format!("{}.onnx", voice));
        let config_path = self.env.piper_voice_dir.join(format!("{}.onnx.json", voice));

        if !model_path.exists() {
            return Err(HeroldError::MissingModel {
                provider: self.provider.name().to_string(),
                path: model_path,
                hint: "Download the voice with: piper --download <voice>".to_string(),
            });
        }

        let program = self
            .env
            .find_executable("piper")
            .unwrap_or_else(|| PathBuf::from("piper"));
        let mut command = Command::new(program);
        command
            .arg("-m")
            .arg(&model_path)
            .arg("-c")
            .arg(&config_path)
            .arg("-f")
            .arg(filepath);

        self.run_local(command, text, filename, filepath).await
    }

    async fn synthesize_coqui(
        &self,
        text: &str,
        filename: &str,
        model: &str,
        filepath: &Path,
    ) -> Result<()> {
        let mut command = Command::new(&self.env.python_bin);
        command.arg("-c").arg(COQUI_SCRIPT).arg(model).arg(filepath);
        self.run_local(command, text, filename, filepath).await
    }

    async fn synthesize_kokoro(
        &self,
        text: &str,
        filename: &str,
        voice: &str,
        filepath: &Path,
    ) -> Result<()> {
        let mut command = Command::new(&self.env.node_bin);
        command
            .arg("-e")
            .arg(KOKORO_SCRIPT)
            .arg(&self.env.kokoro_model_dir)
            .arg(voice)
            .arg(filepath);
        self.run_local(command, text, filename, filepath).await
    }

    async fn synthesize_openai(
        &self,
        text: &str,
        filename: &str,
        voice: &str,
        filepath: &Path,
    ) -> Result<()> {
        let api_key = self
            .env
            .openai_api_key
            .as_deref()
            .ok_or_else(|| HeroldError::MissingApiKey {
                env_var: OPENAI_API_KEY_ENV.to_string(),
            })?;

        let response = self
            .client
            .post(OPENAI_SPEECH_URL)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&serde_json::json!({
                "model": OPENAI_TTS_MODEL,
                "input": clean_cloud_text(text),
                "voice": voice,
            }))
            .send()
            .await
            .map_err(|e| self.failed(filename, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.failed(filename, format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| self.failed(filename, format!("reading response failed: {e}")))?;
        fs::write(filepath, &audio).await?;
        Ok(())
    }
}

impl Synthesizer for ProviderSynthesizer {
    fn provider_name(&self) -> &str {
        self.provider.name()
    }

    async fn synthesize(&self, text: &str, filename: &str, voice: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).await?;
        let filepath = self.output_dir.join(filename);

        match self.provider {
            TtsProvider::Kokoro => self.synthesize_kokoro(text, filename, voice, &filepath).await?,
            TtsProvider::Piper => self.synthesize_piper(text, filename, voice, &filepath).await?,
            TtsProvider::Coqui => self.synthesize_coqui(text, filename, voice, &filepath).await?,
            TtsProvider::Openai => self.synthesize_openai(text, filename, voice, &filepath).await?,
        }

        tracing::info!(provider = self.provider.id(), filename, "synthesized segment");
        Ok(filepath)
    }
}
