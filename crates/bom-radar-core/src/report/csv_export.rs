use std::io::Write;

use crate::error::Error;
use crate::model::{PairMetrics, Rule};

pub fn write_metrics_csv<W: Write>(writer: W, metrics: &[&PairMetrics]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Component",
        "Material",
        "Count",
        "Component_Total_Files",
        "Support",
        "Confidence",
        "Support_Confidence_Sum",
    ])?;
    for m in metrics {
        wtr.write_record(&[
            m.component.clone(),
            m.material.clone(),
            m.count.to_string(),
            m.component_total_files.to_string(),
            m.support.to_string(),
            m.confidence.to_string(),
            m.support_confidence_sum.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_rules_csv<W: Write>(writer: W, rules: &[Rule]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "Component",
        "Material",
        "Status",
        "Support",
        "Confidence",
        "Lift",
        "Antecedent",
        "Consequent",
    ])?;
    for rule in rules {
        wtr.write_record(&[
            rule.component.clone(),
            rule.material.clone(),
            rule.status.map(|s| s.to_string()).unwrap_or_default(),
            rule.support.to_string(),
            rule.confidence.to_string(),
            rule.lift.to_string(),
            rule.antecedent.key(),
            rule.consequent.key(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
