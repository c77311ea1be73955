use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use walkthrough::controller::{Action, CaptureEvent, InputEvent, KeyBindings};
use walkthrough::model::SceneManifest;
use walkthrough::{utils, Walkthrough, WalkthroughConfig, WalkthroughError};

fn captured_session() -> Walkthrough {
    let mut w = Walkthrough::new(WalkthroughConfig::default(), 1280, 720).unwrap();
    w.handle_event(&InputEvent::PointerLockChanged { locked: true });
    w
}

#[test]
fn config_json_overrides_only_named_fields() {
    let config = WalkthroughConfig::from_json_str(
        r#"{
            "locomotion": { "floor_height": -10.0, "acceleration": 200.0 },
            "bindings": { "jump": ["Space", "KeyJ"] },
            "simulate_while_released": true
        }"#,
    )
    .unwrap();

    assert_eq!(config.locomotion.floor_height, -10.0);
    assert_eq!(config.locomotion.acceleration, 200.0);
    assert_eq!(config.locomotion.damping, 5.0);
    assert_eq!(config.bindings.action_for("KeyJ"), Some(Action::Jump));
    assert_eq!(config.bindings.action_for("KeyW"), Some(Action::Forward));
    assert!(config.simulate_while_released);
}

#[test]
fn config_rejects_negative_gravity() {
    let err = WalkthroughConfig::from_json_str(r#"{ "locomotion": { "gravity": -1.0 } }"#).unwrap_err();
    assert!(matches!(err, WalkthroughError::InvalidConfig(_)), "{err}");
}

#[test]
fn config_floor_height_is_honoured() {
    let config = WalkthroughConfig::from_json_str(
        r#"{ "locomotion": { "floor_height": -2.0 }, "simulate_while_released": true }"#,
    )
    .unwrap();
    let mut w = Walkthrough::new(config, 800, 600).unwrap();
    for _ in 0..120 {
        w.on_frame(1.0 / 60.0);
    }
    assert_eq!(w.pose().position.y, -2.0);
    assert!(w.can_jump());
}

#[test]
fn session_refuses_unvalidated_struct_config() {
    let config = WalkthroughConfig {
        look: walkthrough::config::LookConfig { sensitivity: f32::INFINITY, ..Default::default() },
        ..Default::default()
    };
    let err = Walkthrough::new(config, 800, 600).err().unwrap();
    assert!(matches!(err, WalkthroughError::InvalidConfig(_)), "{err}");
}

#[test]
fn default_bindings_cover_wasd_and_arrows() {
    let bindings = KeyBindings::default();
    for (code, action) in [
        ("KeyW", Action::Forward),
        ("ArrowUp", Action::Forward),
        ("KeyS", Action::Backward),
        ("ArrowDown", Action::Backward),
        ("KeyA", Action::Left),
        ("ArrowLeft", Action::Left),
        ("KeyD", Action::Right),
        ("ArrowRight", Action::Right),
        ("Space", Action::Jump),
        ("Escape", Action::Release),
    ] {
        assert_eq!(bindings.action_for(code), Some(action), "{code}");
    }
    assert_eq!(bindings.action_for("KeyQ"), None);
}

#[test]
fn capture_listeners_see_transitions_until_unsubscribed() {
    let mut w = Walkthrough::new(WalkthroughConfig::default(), 800, 600).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let id = {
        let seen = seen.clone();
        w.subscribe_capture(move |event| seen.borrow_mut().push(event))
    };

    w.handle_event(&InputEvent::PointerLockChanged { locked: true });
    // Repeated lock notifications do not re-fire
    w.handle_event(&InputEvent::PointerLockChanged { locked: true });
    w.handle_event(&InputEvent::PointerLockChanged { locked: false });
    assert_eq!(*seen.borrow(), vec![CaptureEvent::Captured, CaptureEvent::Released]);

    assert!(w.unsubscribe_capture(id));
    assert!(!w.unsubscribe_capture(id));
    w.handle_event(&InputEvent::PointerLockChanged { locked: true });
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn look_is_ignored_while_released() {
    let mut w = Walkthrough::new(WalkthroughConfig::default(), 800, 600).unwrap();
    w.handle_event(&InputEvent::MouseMove { dx: 200.0, dy: 200.0 });
    assert_eq!(w.pose().yaw, 0.0);
    assert_eq!(w.pose().pitch, 0.0);
    assert!(w.affordance_visible());
}

#[test]
fn pitch_stays_inside_limits() {
    let mut w = captured_session();
    let limit = w.config().look.pitch_limit;
    w.handle_event(&InputEvent::MouseMove { dx: 0.0, dy: -100_000.0 });
    assert_eq!(w.pose().pitch, limit);
    w.handle_event(&InputEvent::MouseMove { dx: 0.0, dy: 100_000.0 });
    assert_eq!(w.pose().pitch, -limit);
}

#[test]
fn focus_loss_stops_movement() {
    let mut w = captured_session();
    w.handle_event(&InputEvent::KeyDown("KeyW".into()));
    w.on_frame(1.0 / 60.0);
    w.handle_event(&InputEvent::FocusLost);
    let speed_before = w.velocity().z.abs();
    w.on_frame(1.0 / 60.0);
    // No more acceleration, only damping
    assert!(w.velocity().z.abs() < speed_before);
}

#[test]
fn jump_key_repeat_does_not_double_jump() {
    let mut w = captured_session();
    // Settle on the floor
    for _ in 0..600 {
        w.on_frame(1.0 / 60.0);
    }
    assert!(w.can_jump());

    w.handle_event(&InputEvent::KeyDown("Space".into()));
    w.handle_event(&InputEvent::KeyDown("Space".into()));
    w.on_frame(1.0 / 60.0);
    let vy = w.velocity().y;
    assert_eq!(vy, w.config().locomotion.jump_impulse);

    w.handle_event(&InputEvent::KeyDown("Space".into()));
    w.on_frame(1.0 / 60.0);
    assert!(w.velocity().y < vy);
}

#[test]
fn scene_manifest_from_json_and_fallback() {
    let manifest = SceneManifest::from_json_str(
        r#"{
            "background": [0.0, 0.0, 0.0],
            "light": { "position": [0.0, 10.0, 0.0], "intensity": 1.0, "ambient": 0.2 },
            "objects": [{
                "name": "crate",
                "asset": "models/crate.json",
                "transform": { "position": [1.0, 2.0, 3.0] },
                "material": { "color": [0.5, 0.5, 0.5] }
            }]
        }"#,
    )
    .unwrap();
    assert!(manifest.ground.is_none());
    assert_eq!(manifest.objects[0].transform.scale, [1.0; 3]);
    assert_eq!(utils::build_scene_mesh(&manifest, None).vertices.len(), 24);

    assert_eq!(
        SceneManifest::load_or_default(Some("/definitely/not/here.json")),
        SceneManifest::default()
    );
}

#[test]
fn texture_tint_is_average_colour() {
    let dir = std::env::temp_dir().join(format!("walkthrough-tint-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("half.png");

    let mut img = image::RgbImage::new(2, 1);
    img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
    img.put_pixel(1, 0, image::Rgb([255, 255, 0]));
    img.save(&path).unwrap();

    let tint = utils::load_texture_tint(&path).unwrap();
    assert!((tint[0] - 1.0).abs() < 1e-6);
    assert!((tint[1] - 0.5).abs() < 1e-6);
    assert_eq!(tint[2], 0.0);

    assert!(matches!(
        utils::load_texture_tint(Path::new("/definitely/not/here.png")),
        Err(WalkthroughError::Texture { .. })
    ));
    let _ = std::fs::remove_dir_all(&dir);
}
