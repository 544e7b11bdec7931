//! Scripted collaborators for driving the director in tests.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use research_director::Analysis;
use research_director::CodeExecutor;
use research_director::Collaborators;
use research_director::DirectorError;
use research_director::ExperimentDesign;
use research_director::ExperimentDesigner;
use research_director::HypothesisGenerator;
use research_director::ResearchContext;
use research_director::Result;
use research_director::ResultAnalyzer;
use research_director::SkillProvider;
use research_director::Verdict;
use research_runtime::ExecutionOutcome;
use research_runtime::Experiment;
use research_runtime::ExperimentResult;
use research_runtime::Hypothesis;
use research_runtime::ResearchConfig;
use tokio::sync::Mutex;

pub const QUESTION: &str = "Does light intensity affect plant growth?";

pub fn config(max_iterations: u32) -> ResearchConfig {
    let mut config = ResearchConfig::new(QUESTION, "biology");
    config.max_iterations = max_iterations;
    config
}

pub fn hypothesis(id: &str, statement: &str) -> Hypothesis {
    Hypothesis::new(id, statement, "biology", QUESTION)
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Returns its initial batch on the first call and nothing afterwards.
#[derive(Default)]
pub struct ScriptedGenerator {
    initial: Mutex<Option<Vec<Hypothesis>>>,
    refinements: Vec<Hypothesis>,
    fail: bool,
    pub generate_calls: AtomicUsize,
    pub refine_calls: AtomicUsize,
    contexts: Mutex<Vec<ResearchContext>>,
}

impl ScriptedGenerator {
    pub fn new(initial: Vec<Hypothesis>) -> Self {
        Self {
            initial: Mutex::new(Some(initial)),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Contexts passed to `generate`, in order.
    pub async fn contexts(&self) -> Vec<ResearchContext> {
        self.contexts.lock().await.clone()
    }

    /// Every refine call proposes these.
    pub fn refining_to(mut self, refinements: Vec<Hypothesis>) -> Self {
        self.refinements = refinements;
        self
    }
}

#[async_trait]
impl HypothesisGenerator for ScriptedGenerator {
    async fn generate(&self, ctx: &ResearchContext) -> Result<Vec<Hypothesis>> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().await.push(ctx.clone());
        if self.fail {
            return Err(DirectorError::collaborator("generator", "model unavailable"));
        }
        Ok(self.initial.lock().await.take().unwrap_or_default())
    }

    async fn refine(
        &self,
        _hypothesis: &Hypothesis,
        _ctx: &ResearchContext,
    ) -> Result<Vec<Hypothesis>> {
        self.refine_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.refinements.clone())
    }
}

// ---------------------------------------------------------------------------
// Designer
// ---------------------------------------------------------------------------

pub struct FixedDesigner;

#[async_trait]
impl ExperimentDesigner for FixedDesigner {
    async fn design(
        &self,
        hypothesis: &Hypothesis,
        _ctx: &ResearchContext,
    ) -> Result<ExperimentDesign> {
        Ok(ExperimentDesign {
            protocol_name: "fixed_protocol".to_string(),
            code: format!("import math\n# %%\nprint('testing {}')", hypothesis.id),
        })
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub enum ExecMode {
    Succeed,
    Fail,
    Hang(Duration),
}

pub struct ScriptedExecutor {
    mode: ExecMode,
    pub calls: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new(mode: ExecMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CodeExecutor for ScriptedExecutor {
    async fn execute(&self, experiment: &Experiment) -> Result<ExecutionOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            ExecMode::Succeed => Ok(ExecutionOutcome::success(format!("ran {}\n", experiment.id))),
            ExecMode::Fail => Err(DirectorError::collaborator("executor", "sandbox crashed")),
            ExecMode::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(ExecutionOutcome::success("late"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

pub enum AnalyzeMode {
    Conclude(Verdict),
    Inconclusive,
    /// Inconclusive on the first result, concluding after that.
    InconclusiveThen(Verdict),
    Fail,
}

pub struct ScriptedAnalyzer {
    mode: AnalyzeMode,
    seen: Mutex<Vec<ExecutionOutcome>>,
}

impl ScriptedAnalyzer {
    pub fn new(mode: AnalyzeMode) -> Self {
        Self {
            mode,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes handed to the analyzer, in order.
    pub async fn seen(&self) -> Vec<ExecutionOutcome> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl ResultAnalyzer for ScriptedAnalyzer {
    async fn analyze(
        &self,
        result: &ExperimentResult,
        hypothesis: &Hypothesis,
        _ctx: &ResearchContext,
    ) -> Result<Analysis> {
        let previous = {
            let mut seen = self.seen.lock().await;
            seen.push(result.outcome.clone());
            seen.len() - 1
        };
        match self.mode {
            AnalyzeMode::Conclude(verdict) => Ok(Analysis::concluded(
                verdict,
                format!("{} checked against {}", hypothesis.id, result.experiment_id),
            )),
            AnalyzeMode::Inconclusive => Ok(Analysis::inconclusive("not enough signal")),
            AnalyzeMode::InconclusiveThen(_) if previous == 0 => {
                Ok(Analysis::inconclusive("not enough signal"))
            }
            AnalyzeMode::InconclusiveThen(verdict) => Ok(Analysis::concluded(
                verdict,
                format!("{} confirmed on retry", hypothesis.id),
            )),
            AnalyzeMode::Fail => Err(DirectorError::collaborator("analyzer", "parse error")),
        }
    }
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

pub struct ScriptedSkills {
    text: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedSkills {
    pub fn with(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SkillProvider for ScriptedSkills {
    async fn load_skills(&self, _task: &str, _domain: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| DirectorError::collaborator("skills", "skill index missing"))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub generator: Arc<ScriptedGenerator>,
    pub executor: Arc<ScriptedExecutor>,
    pub analyzer: Arc<ScriptedAnalyzer>,
    pub skills: Arc<ScriptedSkills>,
}

impl Harness {
    pub fn new(generator: ScriptedGenerator, exec: ExecMode, analyze: AnalyzeMode) -> Self {
        Self {
            generator: Arc::new(generator),
            executor: Arc::new(ScriptedExecutor::new(exec)),
            analyzer: Arc::new(ScriptedAnalyzer::new(analyze)),
            skills: Arc::new(ScriptedSkills::with("")),
        }
    }

    pub fn with_skills(mut self, skills: ScriptedSkills) -> Self {
        self.skills = Arc::new(skills);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        self.collaborators_with(Arc::new(FixedDesigner))
    }

    pub fn collaborators_with(&self, designer: Arc<dyn ExperimentDesigner>) -> Collaborators {
        Collaborators {
            generator: self.generator.clone(),
            designer,
            executor: self.executor.clone(),
            analyzer: self.analyzer.clone(),
            skills: self.skills.clone(),
        }
    }

    pub fn generate_calls(&self) -> usize {
        self.generator.generate_calls.load(Ordering::SeqCst)
    }

    pub fn refine_calls(&self) -> usize {
        self.generator.refine_calls.load(Ordering::SeqCst)
    }

    pub fn executor_calls(&self) -> usize {
        self.executor.calls.load(Ordering::SeqCst)
    }

    pub fn skill_calls(&self) -> usize {
        self.skills.calls.load(Ordering::SeqCst)
    }
}
