// tests/global_instance.rs
//! The process-wide instance is global state, so everything about it is
//! checked in one test in its own binary.

use displaykit::{
    create_system, instance_exists, with_instance, HeadlessDriver, SystemConfig, SystemError,
};

fn driver(config: &SystemConfig) -> Box<HeadlessDriver> {
    Box::new(HeadlessDriver::new(config.headless.clone()))
}

#[test]
fn it_should_allow_exactly_one_live_instance_per_process() -> anyhow::Result<()> {
    let config = SystemConfig::default();
    assert!(!instance_exists());
    assert!(matches!(
        with_instance(|_| ()),
        Err(SystemError::NoInstance)
    ));

    let guard = create_system(config.clone(), driver(&config))?;
    assert!(instance_exists());
    assert!(matches!(
        create_system(config.clone(), driver(&config)),
        Err(SystemError::AlreadyCreated)
    ));

    let size = with_instance(|system| system.default_new_display_size())?;
    assert_eq!(size, (1024, 768));
    let nested = with_instance(|_| with_instance(|_| ()))?;
    assert!(matches!(nested, Err(SystemError::InstanceBusy)));

    // Another thread sees the process-wide instance but cannot reach it.
    let from_thread = std::thread::spawn(|| {
        let config = SystemConfig::default();
        let created = create_system(config.clone(), driver(&config)).map(|_| ());
        (instance_exists(), created)
    })
    .join()
    .map_err(|_| anyhow::anyhow!("probe thread panicked"))?;
    assert!(!from_thread.0);
    assert!(matches!(from_thread.1, Err(SystemError::AlreadyCreated)));

    let window = with_instance(|system| -> displaykit::Result<_> {
        let display = system.create_default_display()?;
        display.window_id()
    })??;
    assert_eq!(window.0, 1);

    guard.dispose()?;
    assert!(!instance_exists());
    assert!(matches!(
        with_instance(|_| ()),
        Err(SystemError::NoInstance)
    ));

    // Scoped release: dropping the guard frees the slot too.
    {
        let _guard = create_system(config.clone(), driver(&config))?;
        assert!(instance_exists());
    }
    assert!(!instance_exists());

    // A guard released from inside the accessor takes effect on return.
    let guard = create_system(config.clone(), driver(&config))?;
    let still_there = with_instance(move |_| {
        drop(guard);
        instance_exists()
    })?;
    assert!(still_there);
    assert!(!instance_exists());
    assert!(matches!(
        with_instance(|_| ()),
        Err(SystemError::NoInstance)
    ));

    let guard = create_system(config.clone(), driver(&config))?;
    guard.dispose()?;
    Ok(())
}
