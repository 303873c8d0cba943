use mirror_status::report::view::{ActionError, StatusAction, StatusView};
use mirror_status::task::{MirrorStatus, StatusFilter};

#[test]
fn test_parse_actions() {
    assert_eq!(StatusAction::parse("status 42 ov").unwrap(), (42, StatusAction::Overview));
    assert_eq!(StatusAction::parse("status 42 pre").unwrap(), (42, StatusAction::PreviousPage));
    assert_eq!(StatusAction::parse("status 42 nex").unwrap(), (42, StatusAction::NextPage));
    assert_eq!(StatusAction::parse("status 42 ref").unwrap(), (42, StatusAction::Refresh));
    assert_eq!(StatusAction::parse("status 42 ps 15").unwrap(), (42, StatusAction::PageStep(15)));
    assert_eq!(
        StatusAction::parse("status -7 st QueueDl").unwrap(),
        (-7, StatusAction::Filter(StatusFilter::Only(MirrorStatus::QueuedDownload)))
    );
    assert_eq!(
        StatusAction::parse("status 1 st All").unwrap(),
        (1, StatusAction::Filter(StatusFilter::All))
    );
}

#[test]
fn test_parse_rejects_bad_payloads() {
    assert!(matches!(StatusAction::parse("cancel 42"), Err(ActionError::NotStatus(_))));
    assert!(matches!(StatusAction::parse("status abc ov"), Err(ActionError::InvalidUser(_))));
    assert_eq!(StatusAction::parse("status 42"), Err(ActionError::MissingArgument("verb")));
    assert_eq!(StatusAction::parse("status 42 ps"), Err(ActionError::MissingArgument("page_step")));
    assert!(matches!(StatusAction::parse("status 42 ps 0"), Err(ActionError::InvalidArgument(_))));
    assert!(matches!(StatusAction::parse("status 42 st Bogus"), Err(ActionError::InvalidArgument(_))));
    assert!(matches!(StatusAction::parse("status 42 zz"), Err(ActionError::UnknownVerb(_))));
}

#[test]
fn test_view_navigation() {
    let mut view = StatusView::default();
    view.apply(&StatusAction::PageStep(4));
    view.apply(&StatusAction::NextPage);
    assert_eq!(view.page_no, 5);
    view.apply(&StatusAction::PreviousPage);
    view.apply(&StatusAction::PreviousPage);
    // 负页码交给生成报告时回绕
    assert_eq!(view.page_no, -3);

    view.apply(&StatusAction::Filter(StatusFilter::Only(MirrorStatus::Seed)));
    assert_eq!(view.page_no, 1);
    assert_eq!(view.page_step, 4);

    let request = view.request(9);
    assert_eq!(request.requester_id, 9);
    assert_eq!(request.status, StatusFilter::Only(MirrorStatus::Seed));
    assert!(!request.is_user);
}

#[test]
fn test_overview_toggles_owner_view() {
    let mut view = StatusView::for_user();
    view.page_no = 3;
    view.apply(&StatusAction::Overview);
    assert!(!view.is_user);
    assert_eq!(view.page_no, 1);

    let before = view.clone();
    view.apply(&StatusAction::Refresh);
    assert_eq!(view, before);
}

#[test]
fn test_huge_page_step_saturates() {
    let (_, action) = StatusAction::parse("status 1 ps 18446744073709551615").unwrap();
    let mut view = StatusView::default();
    view.apply(&action);
    view.apply(&StatusAction::PreviousPage);
    // 上一页必须往回走
    assert!(view.page_no < 1);

    let (_, action) = StatusAction::parse("status 1 ps 9223372036854775807").unwrap();
    let mut view = StatusView::default();
    view.apply(&action);
    view.apply(&StatusAction::NextPage);
    view.apply(&StatusAction::NextPage);
    assert_eq!(view.page_no, i64::MAX);

    view.apply(&StatusAction::PreviousPage);
    view.apply(&StatusAction::PreviousPage);
    view.apply(&StatusAction::PreviousPage);
    assert_eq!(view.page_no, i64::MIN);
}
