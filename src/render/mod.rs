//! Feature card rendering
//!
//! Rendering happens in two steps: [`CardView`] collects what a card shows
//! (labels, max activations, which samples are visible), then the `render_*`
//! functions turn views into terminal text.

use crate::feature::analysis::{analysis_label, TOP_ACTIVATIONS};
use crate::feature::{Feature, Sample, SampleGroup};
use crate::panel::CustomInputPanel;
use colored::Colorize;
use std::fmt::Write;

/// Samples shown per tab
pub const SAMPLES_PER_TAB: usize = 5;

/// Tab selected when a card is first shown
pub const DEFAULT_TAB: &str = TOP_ACTIVATIONS;

/// Format an activation to 3 decimals, the way every label in the card does
///
/// Exact ties round away from zero and negative zero prints as `0.000`.
/// Everything else is the exact decimal rounding of the float.
pub fn format_activation(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let value = if value == 0.0 { 0.0 } else { value };

    // A tie at 3 decimals means |value| * 2000 is exactly an odd integer
    let magnitude = value.abs();
    let doubled = magnitude * 2000.0;
    let is_tie = doubled % 2.0 == 1.0 && magnitude.mul_add(2000.0, -doubled) == 0.0;

    if is_tie {
        let thousandths = (doubled as u64 + 1) / 2;
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}{}.{:03}", thousandths / 1000, thousandths % 1000);
    }

    format!("{value:.3}")
}

/// Show control characters in token text as the glyphs users type for them
pub fn display_token(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\n' => '⏎',
            '\t' => '⇥',
            '\r' => '↵',
            other => other,
        })
        .collect()
}

/// A named sample as it appears in a tab or the custom-input area
#[derive(Debug, Clone, Copy)]
pub struct SampleBlock<'a> {
    pub name: &'a str,
    pub sample: &'a Sample,
}

/// One tab of the card
#[derive(Debug, Clone)]
pub struct TabView<'a> {
    pub analysis_name: &'a str,
    /// None for analysis names the classifier does not know
    pub label: Option<String>,
    /// Max activation of the group's first sample
    pub max_activation: f64,
    pub sample_names: Vec<String>,
    pub samples: &'a [Sample],
}

impl<'a> TabView<'a> {
    pub fn new(group: &'a SampleGroup) -> Self {
        let shown = &group.samples[..group.samples.len().min(SAMPLES_PER_TAB)];
        Self {
            analysis_name: &group.analysis_name,
            label: analysis_label(&group.analysis_name),
            max_activation: group
                .first()
                .map_or(f64::NEG_INFINITY, Sample::max_activation),
            sample_names: (1..=shown.len()).map(|i| format!("Sample {i}")).collect(),
            samples: shown,
        }
    }

    /// The visible samples with their sequential names
    pub fn blocks(&self) -> impl Iterator<Item = SampleBlock<'_>> {
        self.sample_names
            .iter()
            .zip(self.samples)
            .map(|(name, sample)| SampleBlock { name, sample })
    }

    pub fn summary(&self) -> String {
        format!("Max Activation: {}", format_activation(self.max_activation))
    }
}

/// Everything a feature card displays, in display order
#[derive(Debug, Clone)]
pub struct CardView<'a> {
    pub feature: &'a Feature,
    pub tabs: Vec<TabView<'a>>,
}

impl<'a> CardView<'a> {
    pub fn new(feature: &'a Feature) -> Self {
        Self {
            feature,
            tabs: feature.sample_groups.iter().map(TabView::new).collect(),
        }
    }

    pub fn title(&self) -> String {
        format!(
            "#{} (Activation Times = {})",
            self.feature.feature_index, self.feature.act_times
        )
    }

    pub fn tab(&self, analysis_name: &str) -> Option<&TabView<'a>> {
        self.tabs.iter().find(|t| t.analysis_name == analysis_name)
    }
}

/// Summary line under the custom-input sample
pub fn custom_input_summary(sample: &Sample) -> String {
    format!(
        "Custom Input Max Activation: {}",
        format_activation(sample.max_activation())
    )
}

/// Label of the button that shows or hides the custom-input area
pub fn toggle_label(showing_custom_input: bool) -> &'static str {
    if showing_custom_input {
        "Hide Custom Input"
    } else {
        "Try Custom Input"
    }
}

/// Render one sample: its name, then tokens shaded by activation
pub fn render_sample(block: SampleBlock<'_>, max_feature_act: f64) -> String {
    let mut out = format!("{}\n", block.name.bold());

    for (token, act) in block.sample.context.iter().zip(&block.sample.feature_acts) {
        let text = display_token(&token.text());
        let intensity = if max_feature_act > 0.0 {
            (act / max_feature_act).clamp(0.0, 1.0)
        } else {
            0.0
        };

        if intensity > 0.0 {
            // Blend from white toward orange
            let shade = |full: u8| (255.0 - (255.0 - f64::from(full)) * intensity) as u8;
            let _ = write!(
                out,
                "{}",
                text.black().on_truecolor(shade(255), shade(165), shade(0))
            );
        } else {
            out.push_str(&text);
        }
    }

    out.push('\n');
    out
}

/// Render the tab bar and the selected tab's content
pub fn render_tabs(card: &CardView<'_>, selected: &str) -> String {
    let mut out = String::new();

    let labels: Vec<String> = card
        .tabs
        .iter()
        .map(|tab| {
            let label = tab.label.clone().unwrap_or_default();
            if tab.analysis_name == selected {
                format!("[{}]", label).bold().to_string()
            } else {
                format!(" {} ", label).dimmed().to_string()
            }
        })
        .collect();
    let _ = writeln!(out, "{}", labels.join(" "));

    if let Some(tab) = card.tab(selected) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", tab.summary().bold());
        for block in tab.blocks() {
            let _ = writeln!(out);
            out.push_str(&render_sample(block, card.feature.max_feature_act));
        }
    }

    out
}

/// Render the custom-input area from panel state
pub fn render_custom_input(panel: &CustomInputPanel, max_feature_act: f64) -> String {
    let mut out = format!("{}\n", "Custom Input".bold());

    if panel.is_loading() {
        let _ = writeln!(out, "{}", "Submitting...".dimmed());
    }
    if let Some(error) = panel.error() {
        let _ = writeln!(out, "{}", error.red());
    }
    if let Some(sample) = panel.sample() {
        out.push_str(&render_sample(
            SampleBlock {
                name: "Custom Input",
                sample,
            },
            max_feature_act,
        ));
        let _ = writeln!(out, "{}", custom_input_summary(sample).bold());
    }

    out
}

/// Render a whole card, optionally with the custom-input area expanded
pub fn render_card(card: &CardView<'_>, selected: &str, panel: Option<&CustomInputPanel>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}    {}",
        card.title().bold(),
        format!("<{}>", toggle_label(panel.is_some())).cyan()
    );
    let _ = writeln!(out);

    if let Some(panel) = panel {
        out.push_str(&render_custom_input(panel, card.feature.max_feature_act));
        let _ = writeln!(out);
    }

    out.push_str(&render_tabs(card, selected));
    out
}
