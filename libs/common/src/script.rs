//! Script drafting assistant
//!
//! Turns a topic into a short promotional video script. An absent result
//! means no script was produced; callers keep the topic as-is.

use std::sync::Arc;

use tracing::info;

use crate::remote::ScriptWriter;

/// Persona and structural rules sent with every script request
pub const SCRIPT_SYSTEM_INSTRUCTION: &str = "\
Você é a VideoJá AI, uma inteligência artificial especializada em criar
roteiros curtos, chamativos e altamente visuais para vídeos.

Idioma obrigatório: Português do Brasil.

Objetivo:
Gerar roteiros prontos para virar vídeos com IA, focados em engajamento,
clareza e conversão.

Duração máxima dos roteiros: até 30 segundos.

Estrutura obrigatória de TODO roteiro:
1. Abertura impactante (até 3 segundos) que chame atenção imediata
2. Desenvolvimento rápido e claro da ideia principal
3. Chamada para ação direta e objetiva

Regras:
- Use linguagem simples, popular e persuasiva
- Frases curtas
- Sem emojis
- Sem hashtags
- Sem explicações técnicas
- Texto 100% pronto para narração ou geração de vídeo
- Não explique o que está fazendo, apenas entregue o roteiro final

Sempre entregue o roteiro dividido em cenas ou falas, de forma clara.";

#[derive(Clone)]
pub struct ScriptAssist {
    writer: Arc<dyn ScriptWriter>,
}

impl ScriptAssist {
    pub fn new(writer: Arc<dyn ScriptWriter>) -> Self {
        Self { writer }
    }

    /// Draft a script for `topic`; blank topics never reach the remote
    pub async fn draft(&self, topic: &str) -> Option<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return None;
        }

        let script = self.writer.draft_script(topic).await;
        info!(produced = script.is_some(), "Script drafting finished");
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoWriter {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ScriptWriter for EchoWriter {
        async fn draft_script(&self, topic: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(format!("Cena 1: {}", topic))
        }
    }

    #[tokio::test]
    async fn blank_topic_is_skipped() {
        let writer = Arc::new(EchoWriter {
            calls: AtomicU32::new(0),
        });
        let assist = ScriptAssist::new(writer.clone());

        assert_eq!(assist.draft("  ").await, None);
        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);

        assert_eq!(
            assist.draft(" café ").await.as_deref(),
            Some("Cena 1: café")
        );
        assert_eq!(writer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn instruction_sets_language_and_length() {
        assert!(SCRIPT_SYSTEM_INSTRUCTION.contains("Português do Brasil"));
        assert!(SCRIPT_SYSTEM_INSTRUCTION.contains("30 segundos"));
    }
}
