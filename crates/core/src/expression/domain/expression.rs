use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Affect categories reported by the expression classifier.
///
/// Declaration order is the canonical display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expression {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Expression {
    pub const ALL: [Expression; 7] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Surprised,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Expression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Expression::ALL
            .into_iter()
            .find(|e| e.label() == lower)
            .ok_or_else(|| format!("unknown expression: {s}"))
    }
}

/// Per-expression confidences for one face in one frame.
///
/// Values are passed through unvalidated; the classifier is trusted to
/// produce numbers in [0, 1].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionScores {
    scores: BTreeMap<Expression, f64>,
}

impl ExpressionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, expression: Expression) -> Option<f64> {
        self.scores.get(&expression).copied()
    }

    pub fn set(&mut self, expression: Expression, value: f64) {
        self.scores.insert(expression, value);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Expression, f64)> + '_ {
        self.scores.iter().map(|(e, v)| (*e, *v))
    }

    /// Highest-scoring expression. Ties go to the later one in canonical order.
    pub fn dominant(&self) -> Option<Expression> {
        self.iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(e, _)| e)
    }

    /// Each confidence × 100, for single-frame display.
    pub fn to_percentages(&self) -> ExpressionBreakdown {
        ExpressionBreakdown::new(self.iter().map(|(e, v)| (e, v * 100.0)).collect())
    }
}

impl FromIterator<(Expression, f64)> for ExpressionScores {
    fn from_iter<I: IntoIterator<Item = (Expression, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

/// Ordered `(expression, percentage)` pairs ready for display.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionBreakdown {
    entries: Vec<(Expression, f64)>,
}

impl ExpressionBreakdown {
    pub fn new(entries: Vec<(Expression, f64)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(Expression, f64)] {
        &self.entries
    }

    pub fn get(&self, expression: Expression) -> Option<f64> {
        self.entries
            .iter()
            .find(|(e, _)| *e == expression)
            .map(|(_, p)| *p)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }
}

impl fmt::Display for ExpressionBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (expression, pct)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{expression}: {pct:.2}%")?;
        }
        Ok(())
    }
}
