use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::handlers::analysis::{AnalysisState, Analyzer};
use crate::handlers::profile_intake::ProfileForm;
use crate::models::{ImagePayload, NutritionalEstimate, UserProfile};
use crate::services::NutritionEstimator;

pub const BANNER: &str = "NutriScan AI\nSua calculadora de nutrientes inteligente\n";
pub const BUSY_MESSAGE: &str = "Analisando imagem... Isso pode levar alguns segundos.";

enum Next {
    Restart,
    Quit,
}

/// Line-oriented session: profile intake, then one analysis per image path.
pub struct Terminal<R, W> {
    lines: Lines<R>,
    out: W,
    estimator: Arc<dyn NutritionEstimator>,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, estimator: Arc<dyn NutritionEstimator>) -> Self {
        Self {
            lines: reader.lines(),
            out: writer,
            estimator,
        }
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    pub async fn run(&mut self) -> Result<()> {
        self.write(BANNER).await?;

        loop {
            let Some(profile) = self.collect_profile().await? else {
                break;
            };
            match self.analysis_loop(profile).await? {
                Next::Restart => log::info!("🔄 Session restarted, profile discarded"),
                Next::Quit => break,
            }
        }

        self.write("\nAté logo! 👋\n").await?;
        Ok(())
    }

    async fn write(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }

    /// `None` at end of input.
    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        self.write(label).await?;
        Ok(self.lines.next_line().await?)
    }

    async fn collect_profile(&mut self) -> Result<Option<UserProfile>> {
        self.write("\nPrimeiros Passos\nPrecisamos de algumas informações para começar.\n")
            .await?;

        loop {
            let Some(age) = self.prompt("Sua Idade (Ex: 25): ").await? else {
                return Ok(None);
            };
            let Some(weight) = self.prompt("Seu Peso em kg (Ex: 70.5): ").await? else {
                return Ok(None);
            };
            let Some(height) = self.prompt("Sua Altura em cm (Ex: 175): ").await? else {
                return Ok(None);
            };

            match ProfileForm::new(age, weight, height).submit() {
                Ok(profile) => return Ok(Some(profile)),
                Err(e) => self.write(&format!("❌ {}\n", e.message())).await?,
            }
        }
    }

    async fn analysis_loop(&mut self, profile: UserProfile) -> Result<Next> {
        let analyzer = Analyzer::new(self.estimator.clone(), profile);
        self.write(&render_state(&analyzer.state())).await?;

        loop {
            let label = if matches!(analyzer.state(), AnalysisState::Idle) {
                "\n📸 Tirar Foto ou Escolher Imagem - caminho do arquivo ('perfil' recomeça, 'sair' encerra): "
            } else {
                "\n📸 Tirar Outra Foto - caminho do arquivo ('perfil' recomeça, 'sair' encerra): "
            };
            let Some(line) = self.prompt(label).await? else {
                return Ok(Next::Quit);
            };

            // Terminals often quote dragged-in paths
            let input = line.trim().trim_matches(|c: char| c == '"' || c == '\'');
            match input {
                "" => continue,
                "sair" | "quit" | "exit" => return Ok(Next::Quit),
                "perfil" => return Ok(Next::Restart),
                path => {
                    let image = ImagePayload::from_path(path);
                    analyzer.submit(image);
                    self.write(&render_state(&analyzer.state())).await?;

                    let state = analyzer.wait().await;
                    self.write(&render_state(&state)).await?;
                }
            }
        }
    }
}

pub fn render_estimate(estimate: &NutritionalEstimate) -> String {
    format!(
        "\n🍽️  {}\n\n\
         🔥 Calorias:  {:.1} kcal\n\
         💪 Proteínas: {:.1} g\n\
         🍞 Carbs:     {:.1} g\n\
         ⚖️  Peso:      {:.1} g\n\n\
         Feedback da IA:\n{}\n",
        estimate.food_name,
        estimate.calories,
        estimate.protein,
        estimate.carbohydrates,
        estimate.grams,
        estimate.feedback
    )
}

pub fn render_state(state: &AnalysisState) -> String {
    match state {
        AnalysisState::Idle => "Aguardando uma foto...\n".to_string(),
        AnalysisState::Pending => format!("⏳ {}\n", BUSY_MESSAGE),
        AnalysisState::Succeeded(estimate) => render_estimate(estimate),
        AnalysisState::Failed(failure) => format!("❌ Erro: {}\n", failure.message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, InferenceFailure};
    use crate::services::ai_service::fake::{sample_estimate, FakeEstimator};
    use std::io::Write;
    use tokio::io::BufReader;

    async fn run_script(script: &str, estimator: Arc<dyn NutritionEstimator>) -> String {
        let reader = BufReader::new(script.as_bytes());
        let mut terminal = Terminal::new(reader, Vec::new(), estimator);
        terminal.run().await.unwrap();
        String::from_utf8(terminal.into_writer()).unwrap()
    }

    fn photo() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(b"\xFF\xD8\xFF").unwrap();
        file
    }

    #[test]
    fn test_render_estimate_shows_four_cards_and_feedback() {
        let text = render_estimate(&sample_estimate("Maçã"));

        assert!(text.contains("Maçã"));
        assert!(text.contains("95.0 kcal"));
        assert!(text.contains("Proteínas: 0.5 g"));
        assert!(text.contains("25.0 g"));
        assert!(text.contains("182.0 g"));
        assert!(text.contains("Ótima fonte de fibras"));
    }

    #[test]
    fn test_render_failure() {
        let text = render_state(&AnalysisState::Failed(InferenceFailure::new(FailureKind::Transport)));
        assert_eq!(text, "❌ Erro: Não foi possível analisar a imagem. Tente novamente.\n");
    }

    #[tokio::test]
    async fn test_full_session_with_apple() {
        let file = photo();
        let estimator = Arc::new(FakeEstimator::succeeding(sample_estimate("Maçã")));
        let script = format!("25\n70.5\n175\n{}\nsair\n", file.path().display());

        let output = run_script(&script, estimator.clone()).await;

        assert!(output.starts_with(BANNER));
        assert!(output.contains(BUSY_MESSAGE));
        assert!(output.contains("95.0 kcal"));
        assert!(output.contains("Tirar Outra Foto"));
        assert!(output.contains("Até logo!"));
        assert_eq!(estimator.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_profile_is_reprompted_and_never_analyzed() {
        let estimator = Arc::new(FakeEstimator::succeeding(sample_estimate("Maçã")));

        let output = run_script("abc\n70.5\n175\n", estimator.clone()).await;

        assert!(output.contains("Por favor, insira valores válidos para todos os campos."));
        assert_eq!(output.matches("Sua Idade").count(), 2);
        assert_eq!(estimator.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_analysis_shows_message() {
        let file = photo();
        let estimator = Arc::new(FakeEstimator::failing(InferenceFailure::new(FailureKind::Transport)));
        let script = format!("25\n70.5\n175\n{}\n", file.path().display());

        let output = run_script(&script, estimator).await;

        assert!(output.contains("Erro: Não foi possível analisar a imagem. Tente novamente."));
        assert!(!output.contains("kcal"));
    }

    #[tokio::test]
    async fn test_perfil_restarts_intake() {
        let estimator = Arc::new(FakeEstimator::succeeding(sample_estimate("Maçã")));

        let output = run_script("25\n70\n175\n\nperfil\n30\n80\n180\nsair\n", estimator).await;

        assert_eq!(output.matches("Primeiros Passos").count(), 2);
        assert_eq!(output.matches("Aguardando uma foto...").count(), 2);
    }
}
