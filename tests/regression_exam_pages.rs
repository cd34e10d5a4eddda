use page_behaviors::{ColumnMapBinding, Page, PageConfig, TimeoutParseMode};

const IMPORT_PREVIEW_HTML: &str = r##"
<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Import &amp; map columns</title>
  <script src="/static/js/ui.js"></script>
  <script src="/static/import.js"></script>
</head>
<body>
  <a class="skip-link" href="#content">Skip to main content</a>
  <header><nav><a href="/">Home</a> <a href="/import">Import</a></nav></header>
  <div class="toast toast-success" role="status" data-timeout="2500">File uploaded</div>
  <!-- server-side flash messages -->
  <div class="toast" role="status">3 rows skipped</div>
  <main id="content">
    <form method="post" action="/import/confirm">
      <table class="preview">
        <thead>
          <tr>
            <th><span id="col-label-0" data-original="Q &amp; A">Q &amp; A</span></th>
            <th><span id="col-label-1" data-original="Notes">Notes</span></th>
          </tr>
        </thead>
        <tbody>
          <tr>
            <td>
              <select name="map-0" class="col-map" data-target="col-label-0">
                <option value="">-- keep --</option>
                <option value="question">Question</option>
                <option value="answer">Answer</option>
              </select>
            </td>
            <td>
              <select name="map-1" class="col-map" data-target="col-label-1">
                <option value="">-- keep --</option>
                <option value="ignore" selected>Ignore</option>
              </select>
            </td>
          </tr>
        </tbody>
      </table>
      <button type="submit">Import</button>
    </form>
  </main>
</body>
</html>
"##;

#[test]
fn import_preview_page_wires_behaviors() -> page_behaviors::Result<()> {
    let mut page = Page::from_html(IMPORT_PREVIEW_HTML)?;
    let report = page.load()?;
    assert_eq!(
        report.column_maps,
        vec![
            ColumnMapBinding::new("col-label-0", "Q & A"),
            ColumnMapBinding::new("col-label-1", "Notes"),
        ]
    );
    assert_eq!(report.skip_links, 1);
    assert_eq!(
        report.toasts.iter().map(|t| t.delay_ms).collect::<Vec<_>>(),
        vec![2500, 4000]
    );

    page.select_value("select[name='map-0']", "question")?;
    page.assert_text("#col-label-0", "question")?;
    page.select_value("select[name='map-0']", "")?;
    page.assert_text("#col-label-0", "Q & A")?;

    // Preselected option is not applied until the control changes.
    page.assert_text("#col-label-1", "Notes")?;
    page.dispatch("select[name='map-1']", "change")?;
    page.assert_text("#col-label-1", "ignore")?;
    Ok(())
}

#[test]
fn import_preview_toasts_and_skip_link() -> page_behaviors::Result<()> {
    let mut page = Page::from_html(IMPORT_PREVIEW_HTML)?;
    page.load()?;

    page.click(".skip-link")?;
    page.assert_focused("#content")?;
    page.assert_attr("#content", "tabindex", "-1")?;

    page.advance_time(2500)?;
    page.assert_absent(".toast-success")?;
    page.assert_exists(".toast")?;
    page.advance_time(1500)?;
    page.assert_absent(".toast")?;

    page.assert_text("title", "Import & map columns")?;
    page.assert_focused("#content")?;
    Ok(())
}

#[test]
fn script_bodies_are_not_markup() -> page_behaviors::Result<()> {
    let html = r#"
    <script>
      const fake = '<div class="toast" data-timeout="1">not a toast</div>';
    </script>
    <div class="toast" id="real" data-timeout="10">real</div>
    "#;
    let mut page = Page::from_html(html)?;
    let report = page.load()?;
    assert_eq!(report.toasts.len(), 1);
    page.advance_time(10)?;
    page.assert_absent("#real")?;
    Ok(())
}

#[test]
fn uppercase_markup_is_matched_case_insensitively() -> page_behaviors::Result<()> {
    let html = r#"
    <SPAN ID="lbl" DATA-ORIGINAL="Upper">Upper</SPAN>
    <SELECT CLASS="col-map" ID="c" DATA-TARGET="lbl">
      <OPTION VALUE="x">x</OPTION>
    </SELECT>
    "#;
    let mut page = Page::from_html(html)?;
    let report = page.load()?;
    assert_eq!(report.column_maps, vec![ColumnMapBinding::new("lbl", "Upper")]);

    page.select_value("#c", "x")?;
    page.assert_text("#lbl", "x")?;
    Ok(())
}

#[test]
fn strict_config_defaults_unit_suffixed_timeout() -> page_behaviors::Result<()> {
    let config = PageConfig::default()
        .with_timeout_parse(TimeoutParseMode::Strict)
        .with_default_toast_timeout_ms(1000)
        .with_trace(true)
        .with_trace_log_limit(4);
    let mut page = Page::from_html_with_config(
        r#"<div class="toast" id="t" data-timeout="2500ms">x</div>"#,
        config,
    )?;
    let report = page.load()?;
    assert_eq!(report.toasts[0].delay_ms, 1000);

    let logs = page.take_trace_logs();
    assert!(logs.len() <= 4);
    assert!(
        logs.iter()
            .any(|line| line == r#"[behavior] toast timeout default target=#t raw="2500ms""#)
    );
    Ok(())
}
