use grid_capabilities::{declare_contract, CapabilityContainer, ContainerError, Lifetime};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

trait RegionModule: Send + Sync {
    fn region(&self) -> usize;
}
declare_contract!(dyn RegionModule, "RegionModule");

struct Region(usize);

impl RegionModule for Region {
    fn region(&self) -> usize {
        self.0
    }
}

#[test]
fn test_racing_registrations_of_one_name_have_one_winner() {
    let container = Arc::new(CapabilityContainer::new());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let container = container.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                container.register::<dyn RegionModule, _>("terrain", Lifetime::Singleton, move || {
                    Ok(Arc::new(Region(i)) as Arc<dyn RegionModule>)
                })
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|e| matches!(e, ContainerError::DuplicateName { .. })));
    assert_eq!(container.len(), 1);
}

#[test]
fn test_distinct_names_register_concurrently() {
    let container = Arc::new(CapabilityContainer::new());

    thread::scope(|scope| {
        for i in 0..16 {
            let container = &container;
            scope.spawn(move || {
                container
                    .register::<dyn RegionModule, _>(format!("region-{i}"), Lifetime::Transient, move || {
                        Ok(Arc::new(Region(i)) as Arc<dyn RegionModule>)
                    })
                    .unwrap();
            });
        }
    });

    let all = container.resolve_all::<dyn RegionModule>().unwrap();
    assert_eq!(all.len(), 16);
    for (name, module) in all {
        assert_eq!(name, format!("region-{}", module.region()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_singleton_shared_across_tasks() {
    let container = Arc::new(CapabilityContainer::new());
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = constructed.clone();
    container
        .register::<dyn RegionModule, _>("sea", Lifetime::Singleton, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Region(42)) as Arc<dyn RegionModule>)
        })
        .unwrap();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let container = container.clone();
            tokio::spawn(async move { container.resolve_by_name::<dyn RegionModule>("sea") })
        })
        .collect();

    let mut instances = Vec::new();
    for task in tasks {
        instances.push(task.await.unwrap().unwrap());
    }

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|instance| Arc::ptr_eq(instance, &instances[0])));
    assert_eq!(instances[0].region(), 42);
}
