use std::path::PathBuf;
use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};
use ulid::Ulid;

use consultgrid::blob::FsBlobStore;
use consultgrid::catalog::TimeGrid;
use consultgrid::identity::InMemoryIdentity;
use consultgrid::ingest::TableReader;
use consultgrid::lifecycle::{LifecycleState, Screen};
use consultgrid::model::{ApprovalStatus, Role, SlotStatus, Weekday};
use consultgrid::notify::NotifyHub;
use consultgrid::service::{Collaborators, Consultation, FileUpload, NewAccount, Registration};
use consultgrid::store::{DocumentStore, WalStore};

// ── Test infrastructure ──────────────────────────────────────

fn test_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("consultgrid_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn service(dir: &PathBuf) -> (Consultation, Arc<WalStore>) {
    let store = Arc::new(WalStore::open(dir.join("accounts.wal")).unwrap());
    let svc = Consultation::new(
        TimeGrid::standard(),
        Collaborators {
            identity: Arc::new(InMemoryIdentity::new()),
            store: store.clone(),
            blobs: Arc::new(FsBlobStore::new(dir.join("blobs"))),
            tables: TableReader::new(),
        },
        Arc::new(NotifyHub::new()),
    );
    (svc, store)
}

fn new_account(role: Role, email: &str) -> NewAccount {
    NewAccount {
        role,
        name: email.split('@').next().unwrap_or(email).to_string(),
        email: email.into(),
        password: "correct horse".into(),
        subjects: vec!["Physics".into()],
    }
}

const WEEK: &str = "\
Time,Monday,Tuesday,Wednesday,Thursday,Friday
7:00-7:30,Physics 1,,,,
7:30-8:00,Physics 1,,,,
12:30-1:00,,,Lunch duty,,
3:30-4:00,,,,,Lab
";

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn registration_to_booked_grid() {
    let dir = test_dir();
    let (svc, _store) = service(&dir);

    svc.provision_account(new_account(Role::Admin, "root@uni.edu")).await.unwrap();
    svc.provision_account(new_account(Role::Teacher, "cruz@uni.edu")).await.unwrap();
    let admin = svc.sign_in("root@uni.edu", "correct horse").await.unwrap();
    let teacher = svc.sign_in("cruz@uni.edu", "correct horse").await.unwrap();
    let tid = teacher.account_id().unwrap().clone();

    let mut student = svc
        .register_student(Registration {
            name: "Ana Lim".into(),
            email: "ana@uni.edu".into(),
            password: "correct horse".into(),
            student_id: "2023-0442".into(),
            cor: FileUpload::new("cor.jpg", &b"\xff\xd8\xff jpeg"[..]),
        })
        .await
        .unwrap();
    let sid = student.account_id().unwrap().clone();
    let mut events = svc.notify().subscribe(&sid);

    // Pending students see nothing yet.
    assert_err!(svc.availability(&student, &tid).await);

    let snapshot = assert_ok!(
        svc.upload_schedule(&teacher, FileUpload::new("week.csv", WEEK.as_bytes().to_vec()))
            .await
    );
    // "12:30-1:00" normalizes to "12:30-13:00", which is a real slot.
    assert_eq!(snapshot.booked().count(), 4);
    assert!(snapshot.misses.is_empty());

    assert_ok!(svc.approve_student(&admin, &sid).await);
    student.apply(&events.recv().await.unwrap());
    assert_eq!(student.screen(), Screen::StudentHome);

    let grid = svc.availability(&student, &tid).await.unwrap();
    let status = |day: Weekday, slot: &str| {
        grid.iter()
            .find(|s| s.day == day && s.slot.as_str() == slot)
            .map(|s| s.status)
    };
    assert_eq!(status(Weekday::Monday, "7:30-8:00"), Some(SlotStatus::Booked));
    assert_eq!(status(Weekday::Wednesday, "12:30-13:00"), Some(SlotStatus::Booked));
    assert_eq!(status(Weekday::Friday, "15:30-16:00"), Some(SlotStatus::Booked));
    assert_eq!(status(Weekday::Friday, "16:00-16:30"), Some(SlotStatus::Available));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn accounts_survive_restart() {
    let dir = test_dir();
    let tid;
    let sid;
    {
        let (svc, store) = service(&dir);
        let admin = svc.provision_account(new_account(Role::Admin, "root@uni.edu")).await.unwrap();
        let teacher = svc.provision_account(new_account(Role::Teacher, "cruz@uni.edu")).await.unwrap();
        tid = teacher.id.clone();

        let admin = svc.session_for(&admin.id).await.unwrap();
        svc.upload_schedule_for(&admin, &tid, FileUpload::new("w.csv", WEEK.as_bytes().to_vec()))
            .await
            .unwrap();

        let student = svc
            .register_student(Registration {
                name: "Ana Lim".into(),
                email: "ana@uni.edu".into(),
                password: "correct horse".into(),
                student_id: "2023-0442".into(),
                cor: FileUpload::new("cor.jpg", &b"jpeg"[..]),
            })
            .await
            .unwrap();
        sid = student.account_id().unwrap().clone();
        svc.reject_student(&admin, &sid).await.unwrap();

        store.compact().await.unwrap();
    }

    let (svc, store) = service(&dir);
    assert_eq!(store.list().await.unwrap().len(), 3);

    let teacher = store.get(&tid).await.unwrap().unwrap();
    assert_eq!(teacher.available_slots.len(), 100);
    assert_eq!(teacher.available_slots.iter().filter(|s| !s.is_available()).count(), 4);

    let student = svc.session_for(&sid).await.unwrap();
    assert_eq!(student.state(), LifecycleState::Student(ApprovalStatus::Rejected));
    assert_eq!(student.screen(), Screen::Rejected);

    let _ = std::fs::remove_dir_all(&dir);
}
