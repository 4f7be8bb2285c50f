use askpdf::ask::{AskRequest, NETWORK_ERROR_MESSAGE, REQUEST_FAILED_MESSAGE};
use askpdf::event_source::{Event, KeyCode, SimulatedEventSource};
use askpdf::geometry::Point;
use askpdf::run_app_with_event_source;
use askpdf::test_utils::test_helpers::*;

const PAGE: &[&str] = &[
    "Attention is all you need",
    "The dominant sequence transduction models",
    "are based on recurrent or convolutional networks",
];

fn harness_with(transport: FakeTransport) -> ViewerHarness {
    ViewerHarness::with(&[PAGE], 80, 40, ViewerHarness::options(), transport, true)
}

/// Select "Attention" and open the dialog; it sits at (4,6) under the menu
fn open_dialog(h: &mut ViewerHarness) {
    h.send(
        TestScenarioBuilder::new()
            .drag_select((0, 1), (8, 1))
            .press_char('a')
            .events(),
    );
    assert!(h.viewer.dialog_state().open);
    assert_eq!(h.viewer.dialog_area().map(|a| (a.x, a.y)), Some((4, 6)));
}

#[test]
fn ask_without_selection_sends_nothing() {
    let mut h = harness_with(FakeTransport::answering("unused"));

    h.send(
        TestScenarioBuilder::new()
            .press_char('a')
            .press_enter()
            .events(),
    );

    assert!(!h.viewer.dialog_state().open);
    assert_eq!(h.viewer.asks_in_flight(), 0);
    assert!(h.transport.requests().is_empty());
}

#[test]
fn successful_answer_is_rendered() {
    let mut h = harness_with(FakeTransport::answering(
        "**Attention** weights use $\\alpha$",
    ));
    open_dialog(&mut h);

    h.send(
        TestScenarioBuilder::new()
            .type_text("what?")
            .press_enter()
            .events(),
    );
    assert!(h.viewer.dialog_state().loading);
    h.settle_answer();

    let state = h.viewer.dialog_state();
    assert_eq!(
        state.answer.as_deref(),
        Some("**Attention** weights use $\\alpha$")
    );
    assert!(!state.loading);
    assert!(state.error.is_empty());
    assert_eq!(
        h.transport.requests(),
        vec![AskRequest::new("Attention", "what?")]
    );
    assert!(h.screen().contains("Attention weights use α"));
}

#[test]
fn plain_answer_x_is_set() {
    let mut h = harness_with(FakeTransport::answering("X"));
    open_dialog(&mut h);

    // Submit button: first label on the actions row under a 2-row question
    h.send(TestScenarioBuilder::new().click(6, 11).events());
    h.settle_answer();

    assert_eq!(h.viewer.dialog_state().answer.as_deref(), Some("X"));
    assert!(!h.viewer.dialog_state().loading);
    assert!(h.viewer.dialog_state().error.is_empty());
    // The click landed on the dialog, not the document
    assert_eq!(h.viewer.selection().text(), "Attention");
}

#[test]
fn error_field_is_shown() {
    let mut h = harness_with(FakeTransport::with_reply(200, r#"{"error":"bad"}"#));
    open_dialog(&mut h);

    h.send(TestScenarioBuilder::new().press_enter().events());
    h.settle_answer();

    let state = h.viewer.dialog_state();
    assert_eq!(state.error, "bad");
    assert_eq!(state.answer, None);
    assert!(!state.loading);
    assert!(h.screen().contains("bad"));
}

#[test]
fn failure_status_without_message_uses_generic_text() {
    let mut h = harness_with(FakeTransport::with_reply(500, "{}"));
    open_dialog(&mut h);

    h.send(TestScenarioBuilder::new().press_enter().events());
    h.settle_answer();

    assert_eq!(h.viewer.dialog_state().error, REQUEST_FAILED_MESSAGE);
    assert_eq!(h.viewer.dialog_state().answer, None);
}

#[test]
fn failure_status_prefers_server_message() {
    let mut h = harness_with(FakeTransport::with_reply(
        503,
        r#"{"error":"model overloaded"}"#,
    ));
    open_dialog(&mut h);

    h.send(TestScenarioBuilder::new().press_enter().events());
    h.settle_answer();

    assert_eq!(h.viewer.dialog_state().error, "model overloaded");
}

#[test]
fn unreachable_endpoint_is_a_network_error() {
    let mut h = harness_with(FakeTransport::unreachable());
    open_dialog(&mut h);

    h.send(TestScenarioBuilder::new().press_enter().events());
    h.settle_answer();

    assert_eq!(h.viewer.dialog_state().error, NETWORK_ERROR_MESSAGE);
    assert_eq!(h.viewer.dialog_state().answer, None);
    assert!(!h.viewer.dialog_state().loading);
}

#[test]
fn dialog_drags_by_its_body() {
    let mut h = harness_with(FakeTransport::answering("unused"));
    open_dialog(&mut h);

    // Context row, one row under the top border
    h.send(vec![
        SimulatedEventSource::mouse_down(10, 7),
        SimulatedEventSource::mouse_drag(20, 15),
        SimulatedEventSource::mouse_up(20, 15),
    ]);

    assert_eq!(h.viewer.dialog_state().position, Some(Point::new(14, 14)));
    assert_eq!(h.viewer.dialog_area().map(|a| (a.x, a.y)), Some((14, 14)));
    assert_eq!(h.viewer.selection().text(), "Attention");

    // Moves after release are ignored
    h.send(vec![SimulatedEventSource::mouse_drag(40, 30)]);
    assert_eq!(h.viewer.dialog_state().position, Some(Point::new(14, 14)));
}

#[test]
fn new_selection_resets_dialog_but_keeps_question() {
    let mut h = harness_with(FakeTransport::with_reply(200, r#"{"error":"bad"}"#));
    open_dialog(&mut h);
    h.send(
        TestScenarioBuilder::new()
            .type_text("why")
            .press_enter()
            .events(),
    );
    h.settle_answer();
    h.send(vec![
        SimulatedEventSource::mouse_down(10, 7),
        SimulatedEventSource::mouse_drag(20, 15),
        SimulatedEventSource::mouse_up(20, 15),
    ]);

    h.send(TestScenarioBuilder::new().drag_select((22, 2), (33, 2)).events());

    assert_eq!(h.viewer.selection().text(), "transduction");
    let state = h.viewer.dialog_state();
    assert!(!state.open);
    assert_eq!(state.question, "why");
    assert!(state.error.is_empty());
    assert_eq!(state.answer, None);
    assert_eq!(state.position, None);
}

#[test]
fn wheel_over_dialog_scrolls_answer_not_document() {
    let long: String = (1..=40).map(|i| format!("point {i}\n\n")).collect();
    let mut h = harness_with(FakeTransport::answering(&long));
    open_dialog(&mut h);
    h.send(TestScenarioBuilder::new().press_enter().events());
    h.settle_answer();
    assert!(h.screen().contains("point 1 "));

    let area = h.viewer.dialog_area().unwrap();
    let inside = (area.x + 2, area.y + area.height - 3);
    for _ in 0..5 {
        h.send(TestScenarioBuilder::new().scroll_down(inside.0, inside.1).events());
    }

    assert_eq!(h.viewer.selection().text(), "Attention");
    assert!(h.viewer.dialog_state().open);
    assert!(!h.screen().contains("point 1 "));
}

#[test]
fn editing_keys_stay_in_the_question() {
    let mut h = harness_with(FakeTransport::answering("unused"));
    open_dialog(&mut h);
    h.send(TestScenarioBuilder::new().type_text("why").events());

    h.send(vec![key(KeyCode::Home), key(KeyCode::End), key(KeyCode::Left)]);
    assert_eq!(
        h.viewer
            .handle_event(&SimulatedEventSource::ctrl_char_key('q')),
        None
    );
    h.send(vec![SimulatedEventSource::ctrl_char_key('o')]);

    let state = h.viewer.dialog_state();
    assert!(state.open);
    assert_eq!(state.question, "why");
    assert_eq!(h.viewer.selection().text(), "Attention");
    assert_eq!(h.viewer.scroll(), 0);
    assert!(!h.viewer.is_file_prompt_active());
}

#[test]
fn escape_forgets_answer_and_position() {
    let mut h = harness_with(FakeTransport::answering("X"));
    open_dialog(&mut h);
    h.send(vec![
        SimulatedEventSource::mouse_down(10, 7),
        SimulatedEventSource::mouse_drag(20, 15),
        SimulatedEventSource::mouse_up(20, 15),
    ]);
    h.send(TestScenarioBuilder::new().type_text("why").press_enter().events());
    h.settle_answer();
    assert_eq!(h.viewer.dialog_state().answer.as_deref(), Some("X"));

    h.send(TestScenarioBuilder::new().press_esc().events());

    let state = h.viewer.dialog_state();
    assert!(!state.open);
    assert_eq!(state.answer, None);
    assert_eq!(state.position, None);
    assert!(state.error.is_empty());
    assert_eq!(state.question, "why");
}

#[test]
fn paste_goes_into_question() {
    let mut h = harness_with(FakeTransport::answering("unused"));
    open_dialog(&mut h);

    h.send(vec![Event::Paste("first\r\nsecond".to_string())]);

    assert_eq!(h.viewer.dialog_state().question, "first\nsecond");
}

#[test]
fn close_button_keeps_selection() {
    let mut h = harness_with(FakeTransport::answering("unused"));
    open_dialog(&mut h);

    // " Submit " is 8 wide, then a gap
    h.send(TestScenarioBuilder::new().click(15, 11).events());

    assert!(!h.viewer.dialog_state().open);
    assert_eq!(h.viewer.selection().text(), "Attention");
    assert!(h.viewer.menu_area().is_some());
}

#[test]
fn event_loop_copies_and_quits() {
    let mut h = harness_with(FakeTransport::answering("unused"));
    let mut source = TestScenarioBuilder::new()
        .drag_select((0, 1), (8, 1))
        .press_char('c')
        .quit()
        .build();

    run_app_with_event_source(&mut h.terminal, &mut h.viewer, &mut source).unwrap();

    assert_eq!(*h.system_clipboard.borrow(), vec!["Attention".to_string()]);
    assert!(!h.viewer.selection().is_active());
}
