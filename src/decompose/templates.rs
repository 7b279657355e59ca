// src/decompose/templates.rs

//! Decomposition step templates.
//!
//! When a compound description has no conjunction clauses to split on, the
//! subtasks come from one of these named templates, selected by keyword
//! classification of the task's type and text. Step wording matters: the
//! sequential markers ("after", "then") inside the steps are what the
//! dependency inference keys on.

/// Named decomposition pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    BugFixing,
    CodeGeneration,
    Refactoring,
    Optimization,
    Generic,
}

impl TemplateKind {
    pub fn name(&self) -> &'static str {
        match self {
            TemplateKind::BugFixing => "bug_fixing",
            TemplateKind::CodeGeneration => "code_generation",
            TemplateKind::Refactoring => "refactoring",
            TemplateKind::Optimization => "optimization",
            TemplateKind::Generic => "generic",
        }
    }

    /// Steps for this pattern, in intended order.
    pub fn steps(&self) -> &'static [&'static str] {
        match self {
            TemplateKind::BugFixing => &[
                "Analyze the reported failure",
                "Implement a fix after the analysis",
                "Test the fix after it is implemented",
                "Verify the fix then close out",
            ],
            TemplateKind::CodeGeneration => &[
                "Analyze the requirements",
                "Design the structure after the analysis",
                "Implement the code after the design",
                "Test the implementation after implementing",
            ],
            TemplateKind::Refactoring => &[
                "Analyze the existing structure",
                "Refactor the code after the analysis",
                "Test the refactored code after the changes",
                "Verify behaviour is unchanged then finish",
            ],
            TemplateKind::Optimization => &[
                "Profile the current performance",
                "Optimize the hot paths after profiling",
                "Test the optimized paths after the changes",
                "Verify the speedup then record results",
            ],
            // The five-step fallback: analyze, design, implement, test, verify.
            TemplateKind::Generic => &[
                "Analyze the request",
                "Design an approach after the analysis",
                "Implement the approach after the design",
                "Test the implementation after implementing",
                "Verify the outcome then report",
            ],
        }
    }
}

/// Classify a task's combined type + description text into a template.
pub fn classify(text: &str) -> TemplateKind {
    let text = text.to_lowercase();

    let matches_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if matches_any(&["fix", "bug", "broken", "error", "crash"]) {
        TemplateKind::BugFixing
    } else if matches_any(&["refactor", "restructure", "clean up", "cleanup"]) {
        TemplateKind::Refactoring
    } else if matches_any(&["optimize", "performance", "slow", "speed up"]) {
        TemplateKind::Optimization
    } else if matches_any(&["generate", "create", "implement", "build", "write"]) {
        TemplateKind::CodeGeneration
    } else {
        TemplateKind::Generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_keywords() {
        assert_eq!(classify("fix the broken login"), TemplateKind::BugFixing);
        assert_eq!(classify("refactor the parser"), TemplateKind::Refactoring);
        assert_eq!(
            classify("optimize the slow query"),
            TemplateKind::Optimization
        );
        assert_eq!(
            classify("implement a new endpoint"),
            TemplateKind::CodeGeneration
        );
        assert_eq!(classify("do something unusual"), TemplateKind::Generic);
    }

    #[test]
    fn bug_fixing_wins_over_generation_keywords() {
        // "fix" is checked before "implement".
        assert_eq!(
            classify("implement a fix for the crash"),
            TemplateKind::BugFixing
        );
    }

    #[test]
    fn generic_template_has_five_steps() {
        assert_eq!(TemplateKind::Generic.steps().len(), 5);
    }
}
