use page_behaviors::Page;
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};

const BEHAVIOR_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/behavior_property_fuzz_test.txt";
const DEFAULT_BEHAVIOR_PROPTEST_CASES: u32 = 128;

const IMPORT_PAGE_HTML: &str = r##"
<a class="skip-link" href="#main">Skip to content</a>
<input id="search">
<div class="toast" id="t0" data-timeout="300">Imported</div>
<div class="toast" id="t1">Welcome</div>
<div class="toast" id="t2" data-timeout="750ms">Saved</div>
<div class="toast" id="t3" data-timeout="oops">Hint</div>
<main id="main">
  <span id="lbl-0" data-original="Column A">Column A</span>
  <span id="lbl-1" data-original="Column B">Column B</span>
  <select id="c0" class="col-map" data-target="lbl-0">
    <option value="">(keep)</option>
    <option value="question">question</option>
    <option value="answer">answer</option>
  </select>
  <select id="c1" class="col-map" data-target="lbl-1">
    <option value="">(keep)</option>
    <option value="question">question</option>
    <option value="answer">answer</option>
  </select>
</main>
"##;

const TOAST_DUE_AT: [i64; 4] = [300, 4000, 750, 4000];
const FALLBACKS: [&str; 2] = ["Column A", "Column B"];
const OPTION_VALUES: [&str; 4] = ["", "question", "answer", "unknown"];

#[derive(Clone, Debug)]
enum PageAction {
    Select { control: usize, option: usize },
    Advance(i64),
    Dismiss(usize),
    ClearTimer(usize),
    ClickSkipLink,
    FocusSearch,
    RunNextTimer,
}

#[derive(Debug)]
struct PageModel {
    now_ms: i64,
    toast_present: [bool; 4],
    timer_pending: [bool; 4],
    labels: [String; 2],
    focused: Option<&'static str>,
}

impl PageModel {
    fn new() -> Self {
        Self {
            now_ms: 0,
            toast_present: [true; 4],
            timer_pending: [true; 4],
            labels: FALLBACKS.map(str::to_string),
            focused: None,
        }
    }

    fn fire_due(&mut self) {
        for (idx, due_at) in TOAST_DUE_AT.iter().enumerate() {
            if self.timer_pending[idx] && *due_at <= self.now_ms {
                self.timer_pending[idx] = false;
                self.toast_present[idx] = false;
            }
        }
    }

    fn next_timer(&self) -> Option<usize> {
        (0..TOAST_DUE_AT.len())
            .filter(|idx| self.timer_pending[*idx])
            .min_by_key(|idx| (TOAST_DUE_AT[*idx], *idx))
    }
}

fn env_proptest_cases(var_name: &str, default_cases: u32) -> u32 {
    std::env::var(var_name)
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default_cases)
}

fn behavior_proptest_cases() -> u32 {
    std::env::var("PAGE_BEHAVIORS_BEHAVIOR_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or_else(|| {
            env_proptest_cases(
                "PAGE_BEHAVIORS_PROPTEST_CASES",
                DEFAULT_BEHAVIOR_PROPTEST_CASES,
            )
        })
}

fn page_action_strategy() -> BoxedStrategy<PageAction> {
    prop_oneof![
        5 => (0..2usize, 0..OPTION_VALUES.len())
            .prop_map(|(control, option)| PageAction::Select { control, option }),
        4 => prop_oneof![0..=50i64, 100..=1500i64].prop_map(PageAction::Advance),
        2 => (0..4usize).prop_map(PageAction::Dismiss),
        1 => (0..4usize).prop_map(PageAction::ClearTimer),
        2 => Just(PageAction::ClickSkipLink),
        1 => Just(PageAction::FocusSearch),
        1 => Just(PageAction::RunNextTimer),
    ]
    .boxed()
}

fn page_action_sequence_strategy() -> BoxedStrategy<Vec<PageAction>> {
    vec(page_action_strategy(), 1..=32).boxed()
}

fn run_action(
    page: &mut Page,
    model: &mut PageModel,
    timer_ids: &[i64],
    action: &PageAction,
) -> page_behaviors::Result<()> {
    match action {
        PageAction::Select { control, option } => {
            let value = OPTION_VALUES[*option];
            page.select_value(&format!("#c{control}"), value)?;
            model.labels[*control] = match value {
                "" | "unknown" => FALLBACKS[*control].to_string(),
                other => other.to_string(),
            };
        }
        PageAction::Advance(delta_ms) => {
            page.advance_time(*delta_ms)?;
            model.now_ms += delta_ms;
            model.fire_due();
        }
        PageAction::Dismiss(idx) => {
            // Dismissing needs a match, so only present toasts are targeted.
            if model.toast_present[*idx] {
                let removed = page.dismiss(&format!("#t{idx}"))?;
                assert!(removed);
                model.toast_present[*idx] = false;
                model.timer_pending[*idx] = false;
            }
        }
        PageAction::ClearTimer(idx) => {
            let cleared = page.clear_timer(timer_ids[*idx]);
            assert_eq!(cleared, model.timer_pending[*idx]);
            model.timer_pending[*idx] = false;
        }
        PageAction::ClickSkipLink => {
            page.click(".skip-link")?;
            model.focused = Some("main");
        }
        PageAction::FocusSearch => {
            page.focus("#search")?;
            model.focused = Some("search");
        }
        PageAction::RunNextTimer => {
            let ran = page.run_next_timer()?;
            let next = model.next_timer();
            assert_eq!(ran, next.is_some());
            if let Some(idx) = next {
                model.now_ms = model.now_ms.max(TOAST_DUE_AT[idx]);
                model.timer_pending[idx] = false;
                model.toast_present[idx] = false;
            }
        }
    }
    Ok(())
}

fn assert_page_matches_model(
    page: &Page,
    model: &PageModel,
    step: usize,
    action: &PageAction,
) -> TestCaseResult {
    prop_assert_eq!(page.now_ms(), model.now_ms, "clock after step {}: {:?}", step, action);

    for (idx, present) in model.toast_present.iter().enumerate() {
        let selector = format!("#t{idx}");
        let exists = page
            .exists(&selector)
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        prop_assert_eq!(
            exists,
            *present,
            "toast {} after step {}: {:?}",
            selector,
            step,
            action
        );
    }

    let pending = model.timer_pending.iter().filter(|p| **p).count();
    prop_assert_eq!(page.pending_timers().len(), pending);

    for (idx, expected) in model.labels.iter().enumerate() {
        let selector = format!("#lbl-{idx}");
        let text = page
            .text(&selector)
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        prop_assert_eq!(&text, expected, "label {} after step {}: {:?}", selector, step, action);
    }

    let active = page.active_element_id();
    prop_assert_eq!(
        active.as_deref(),
        model.focused,
        "focus after step {}: {:?}",
        step,
        action
    );
    Ok(())
}

fn assert_behavior_sequence_matches_model(actions: &[PageAction]) -> TestCaseResult {
    let mut page =
        Page::from_html(IMPORT_PAGE_HTML).map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
    let report = page
        .load()
        .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
    let timer_ids = report.toasts.iter().map(|t| t.timer_id).collect::<Vec<_>>();
    prop_assert_eq!(
        report.toasts.iter().map(|t| t.due_at).collect::<Vec<_>>(),
        TOAST_DUE_AT.to_vec()
    );

    let mut model = PageModel::new();
    for (step, action) in actions.iter().enumerate() {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_action(&mut page, &mut model, &timer_ids, action)
        }));

        match outcome {
            Err(_) => {
                prop_assert!(
                    false,
                    "action panicked at step {step}: {action:?}, actions={actions:?}"
                );
            }
            Ok(Err(error)) => {
                prop_assert!(
                    false,
                    "action returned error at step {step}: {action:?}, error={error:?}, actions={actions:?}"
                );
            }
            Ok(Ok(())) => {}
        }

        assert_page_matches_model(&page, &model, step, action)?;
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: behavior_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(BEHAVIOR_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn page_actions_follow_behavior_model(actions in page_action_sequence_strategy()) {
        assert_behavior_sequence_matches_model(&actions)?;
    }
}
