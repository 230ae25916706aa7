//! Markdown screening report for a single image.

use std::path::Path;

use anyhow::Context;
use chestscan_core::VerdictSet;
use chrono::NaiveDateTime;
use clap::Args;

/// Patient details printed in the report header. All optional.
#[derive(Args, Debug, Default, Clone)]
pub struct PatientInfo {
    #[arg(long)]
    pub report_id: Option<String>,

    #[arg(long)]
    pub patient_id: Option<String>,

    #[arg(long)]
    pub patient_name: Option<String>,

    #[arg(long)]
    pub age: Option<String>,

    #[arg(long)]
    pub sex: Option<String>,
}

const INTERPRETATION: &str = "This report is generated using a DenseNet121-based deep learning \
model trained on the NIH Chest X-ray14 dataset. The model provides probability scores for 14 \
different thoracic diseases. **This is an AI-assisted screening tool and should be reviewed by a \
qualified radiologist before making any clinical decisions.**";

const RECOMMENDATIONS: &[&str] = &[
    "Follow-up with a board-certified radiologist for comprehensive evaluation",
    "Clinical correlation with patient history and symptoms recommended",
    "Consider additional imaging studies if clinically indicated",
    "Correlate findings with physical examination and laboratory results",
];

const DISCLAIMER: &str = "*This report is computer-generated and does not replace professional \
medical advice. For questions or concerns, please consult your healthcare provider.*";

/// Render the report as Markdown.
pub fn render_report(
    verdicts: &VerdictSet,
    image: &Path,
    patient: &PatientInfo,
    generated: NaiveDateTime,
) -> String {
    let mut out = String::new();
    let na = |v: &Option<String>| v.as_deref().map(escape).unwrap_or_else(|| "N/A".into());

    out.push_str("# CHEST X-RAY ANALYSIS REPORT\n\n");
    out.push_str("| | |\n|---|---|\n");
    out.push_str(&format!("| **Report ID:** | {} |\n", na(&patient.report_id)));
    out.push_str(&format!(
        "| **Date:** | {} |\n",
        generated.format("%B %d, %Y at %I:%M %p")
    ));
    out.push_str(&format!("| **Patient ID:** | {} |\n", na(&patient.patient_id)));
    let name = patient
        .patient_name
        .as_deref()
        .map(escape)
        .unwrap_or_else(|| "Anonymous".into());
    out.push_str(&format!("| **Patient Name:** | {name} |\n"));
    out.push_str(&format!(
        "| **Age/Sex:** | {} / {} |\n",
        na(&patient.age),
        na(&patient.sex)
    ));

    out.push_str("\n## AI-ASSISTED DIAGNOSTIC FINDINGS\n\n");
    let found = verdicts.positive_count();
    if found == 0 {
        out.push_str(
            "**No abnormalities detected.** The AI analysis did not identify any significant \
             pathological findings.\n",
        );
    } else {
        out.push_str(&format!("**Found {found} potential abnormality(ies):**\n\n"));
        out.push_str("| Disease | Confidence | Threshold | Status |\n");
        out.push_str("|---|---:|---:|---|\n");
        for rec in verdicts.positives() {
            out.push_str(&format!(
                "| {} | {:.1}% | {:.1}% | DETECTED |\n",
                rec.label.display_name(),
                rec.calibrated_score * 100.0,
                rec.threshold * 100.0
            ));
        }
    }

    out.push_str("\n## CHEST X-RAY IMAGE\n\n");
    out.push_str(&format!("![Chest X-ray]({})\n", image.display()));

    out.push_str("\n## CLINICAL INTERPRETATION\n\n");
    out.push_str(INTERPRETATION);
    out.push('\n');

    if found > 0 {
        out.push_str("\n## RECOMMENDATIONS\n\n");
        for item in RECOMMENDATIONS {
            out.push_str(&format!("- {item}\n"));
        }
    }

    out.push_str("\n---\n\n");
    out.push_str(DISCLAIMER);
    out.push('\n');
    out
}

/// Render and write the report to `path`.
pub fn write_report(
    path: &Path,
    verdicts: &VerdictSet,
    image: &Path,
    patient: &PatientInfo,
    generated: NaiveDateTime,
) -> anyhow::Result<()> {
    let text = render_report(verdicts, image, patient, generated);
    std::fs::write(path, text).with_context(|| format!("writing report to {}", path.display()))
}

/// Keep user-supplied text from breaking table rows.
fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}
