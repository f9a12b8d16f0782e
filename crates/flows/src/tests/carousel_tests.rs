use super::*;

fn running(len: usize) -> Carousel {
    let mut carousel = Carousel::new(len);
    carousel.start();
    carousel
}

#[test]
fn five_ticks_wrap_back_to_the_start() {
    let mut carousel = running(5);
    for expected in [1, 2, 3, 4, 0] {
        assert!(carousel.tick());
        assert_eq!(carousel.index(), Some(expected));
    }
}

#[test]
fn swipes_past_the_threshold_move_one_item() {
    let mut carousel = running(5);

    assert_eq!(carousel.swipe(-60.0), Some(SwipeDirection::Left));
    assert_eq!(carousel.index(), Some(1));

    assert_eq!(carousel.swipe(-30.0), None);
    assert_eq!(carousel.swipe(50.0), None);
    assert_eq!(carousel.index(), Some(1));

    assert_eq!(carousel.swipe(75.0), Some(SwipeDirection::Right));
    assert_eq!(carousel.swipe(75.0), Some(SwipeDirection::Right));
    assert_eq!(carousel.index(), Some(4));
}

#[test]
fn touch_gesture_pauses_then_resumes() {
    let mut carousel = running(3);

    carousel.touch_start(200.0);
    assert_eq!(carousel.autoplay(), AutoplayState::Paused);
    assert!(!carousel.tick());

    assert_eq!(carousel.touch_end(120.0), Some(SwipeDirection::Left));
    assert_eq!(carousel.index(), Some(1));
    assert_eq!(carousel.autoplay(), AutoplayState::Running);
}

#[test]
fn manual_navigation_pauses_until_pointer_leaves() {
    let mut carousel = running(4);

    carousel.go_to_previous();
    assert_eq!(carousel.index(), Some(3));
    assert_eq!(carousel.autoplay(), AutoplayState::Paused);
    assert!(!carousel.tick());

    carousel.go_to_index(9);
    assert_eq!(carousel.index(), Some(3));
    carousel.go_to_index(1);
    assert_eq!(carousel.index(), Some(1));

    carousel.pointer_leave();
    assert!(carousel.tick());
    assert_eq!(carousel.index(), Some(2));

    carousel.pointer_enter();
    assert_eq!(carousel.autoplay(), AutoplayState::Paused);
}

#[test]
fn empty_and_single_item_carousels_do_not_move() {
    let mut empty = running(0);
    assert_eq!(empty.index(), None);
    assert_eq!(empty.autoplay(), AutoplayState::Idle);
    empty.go_to_next();
    assert_eq!(empty.swipe(-80.0), None);
    assert_eq!(empty.index(), None);

    let mut single = running(1);
    assert_eq!(single.autoplay(), AutoplayState::Idle);
    assert!(!single.tick());
    single.go_to_next();
    single.go_to_previous();
    assert_eq!(single.index(), Some(0));
}

#[test]
fn shrinking_the_collection_keeps_the_index_in_bounds() {
    let mut carousel = running(5);
    carousel.go_to_index(4);

    carousel.set_len(3);
    assert_eq!(carousel.index(), Some(0));

    carousel.set_len(1);
    assert_eq!(carousel.autoplay(), AutoplayState::Idle);

    carousel.set_len(0);
    assert_eq!(carousel.index(), None);
}

#[test]
fn growing_again_resumes_requested_autoplay() {
    let mut carousel = running(5);
    carousel.set_len(1);
    assert_eq!(carousel.autoplay(), AutoplayState::Idle);

    carousel.set_len(4);
    assert_eq!(carousel.autoplay(), AutoplayState::Running);
    assert!(carousel.tick());

    carousel.stop();
    carousel.set_len(1);
    carousel.set_len(4);
    assert_eq!(carousel.autoplay(), AutoplayState::Idle);
}

#[tokio::test(start_paused = true)]
async fn autoplay_ticks_on_its_period_and_stops_cleanly() {
    let carousel = Arc::new(Mutex::new(Carousel::new(5)));
    let mut autoplay = Autoplay::start(Arc::clone(&carousel), DEFAULT_AUTOPLAY_PERIOD);

    tokio::time::sleep(Duration::from_secs(22)).await;
    assert_eq!(carousel.lock().unwrap().index(), Some(3));

    carousel.lock().unwrap().pointer_enter();
    tokio::time::sleep(Duration::from_secs(14)).await;
    assert_eq!(carousel.lock().unwrap().index(), Some(3));

    autoplay.stop();
    assert_eq!(carousel.lock().unwrap().autoplay(), AutoplayState::Idle);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(carousel.lock().unwrap().index(), Some(3));
    assert!(!autoplay.is_active());
}

#[tokio::test(start_paused = true)]
async fn autoplay_started_on_an_empty_carousel_rotates_once_items_arrive() {
    let carousel = Arc::new(Mutex::new(Carousel::new(0)));
    let autoplay = Autoplay::start(Arc::clone(&carousel), DEFAULT_AUTOPLAY_PERIOD);

    tokio::time::sleep(Duration::from_secs(8)).await;
    assert_eq!(carousel.lock().unwrap().autoplay(), AutoplayState::Idle);
    assert!(autoplay.is_active());

    carousel.lock().unwrap().set_len(5);
    tokio::time::sleep(Duration::from_secs(22)).await;
    assert_eq!(carousel.lock().unwrap().index(), Some(3));
    assert!(autoplay.is_active());
}

#[tokio::test(start_paused = true)]
async fn autoplay_survives_a_shrink_to_one_item() {
    let carousel = Arc::new(Mutex::new(Carousel::new(5)));
    let autoplay = Autoplay::start(Arc::clone(&carousel), DEFAULT_AUTOPLAY_PERIOD);

    carousel.lock().unwrap().set_len(1);
    tokio::time::sleep(Duration::from_secs(8)).await;
    assert_eq!(carousel.lock().unwrap().index(), Some(0));

    carousel.lock().unwrap().set_len(5);
    tokio::time::sleep(Duration::from_secs(22)).await;
    let state = carousel.lock().unwrap().clone();
    assert_eq!(state.autoplay(), AutoplayState::Running);
    assert_eq!(state.index(), Some(3));
    assert!(autoplay.is_active());
}
