//! Process-lifetime one-shot diagnostics.

use std::sync::atomic::{AtomicBool, Ordering};

/// Conditions that are reported once and then stay quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Baseline recovered from the rig transform instead of the descriptor
    FallbackBaseline,
    /// Baseline above the plausibility bound
    LargeBaseline,
    /// Detailed explanation of a non-positive baseline
    DegenerateBaseline,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 3] = [
        DiagnosticKind::FallbackBaseline,
        DiagnosticKind::LargeBaseline,
        DiagnosticKind::DegenerateBaseline,
    ];

    const fn index(self) -> usize {
        match self {
            DiagnosticKind::FallbackBaseline => 0,
            DiagnosticKind::LargeBaseline => 1,
            DiagnosticKind::DegenerateBaseline => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::FallbackBaseline => "fallback_baseline",
            DiagnosticKind::LargeBaseline => "large_baseline",
            DiagnosticKind::DegenerateBaseline => "degenerate_baseline",
        }
    }
}

/// One guarded single-assignment flag per [`DiagnosticKind`].
///
/// Safe to share across callback threads; each flag flips at most once.
#[derive(Debug, Default)]
pub struct OneShotDiagnostics {
    flags: [AtomicBool; 3],
}

impl OneShotDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for exactly one caller per kind.
    #[inline]
    pub fn fire(&self, kind: DiagnosticKind) -> bool {
        !self.flags[kind.index()].swap(true, Ordering::AcqRel)
    }

    pub fn has_fired(&self, kind: DiagnosticKind) -> bool {
        self.flags[kind.index()].load(Ordering::Acquire)
    }

    /// Kinds reported so far, in declaration order.
    pub fn fired(&self) -> Vec<DiagnosticKind> {
        DiagnosticKind::ALL
            .into_iter()
            .filter(|&kind| self.has_fired(kind))
            .collect()
    }
}
