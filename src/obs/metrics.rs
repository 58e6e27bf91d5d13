// self
use crate::obs::SubmitLabel;

/// Records a submit outcome via the global metrics recorder (when enabled).
pub fn record_submit_outcome(component: &str, label: SubmitLabel) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"flow_executor_submit_total",
			"component" => component.to_owned(),
			"outcome" => label.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (component, label);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_submit_outcome_noop_without_metrics() {
		record_submit_outcome("ak-stage-consent", SubmitLabel::Failure);
	}
}
