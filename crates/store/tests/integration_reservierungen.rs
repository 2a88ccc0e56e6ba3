//! Integration-Tests fuer den In-Memory-Reservierungsspeicher

use parla_store::{
    InMemoryStore, NeueReservierung, ReservationStore, ReservierungsAenderung,
    ReservierungsStatus, ReservierungsSuche, RowId, StoreError,
};

fn neue(name: &str, phone: &str) -> NeueReservierung {
    NeueReservierung {
        reservation_date: "2025-07-14T19:30:00".into(),
        guests_count: 2,
        name: name.into(),
        phone: phone.into(),
        email: Some("gast@example.com".into()),
    }
}

#[tokio::test]
async fn reservierung_anlegen_und_laden() {
    let store = InMemoryStore::neu();

    let r = store.create(neue("Ada", "+49 170 1234567")).await.unwrap();
    assert_eq!(r.row_id, RowId(1));
    assert_eq!(r.status, ReservierungsStatus::Bestaetigt);
    assert_eq!(r.email.as_deref(), Some("gast@example.com"));

    let geladen = store.laden(r.row_id).unwrap();
    assert_eq!(geladen, r);
}

#[tokio::test]
async fn zeilennummern_fortlaufend() {
    let store = InMemoryStore::neu();
    let a = store.create(neue("A", "1")).await.unwrap();
    let b = store.create(neue("B", "2")).await.unwrap();
    assert_eq!(a.row_id, RowId(1));
    assert_eq!(b.row_id, RowId(2));
    assert_eq!(store.anzahl(), 2);
}

#[tokio::test]
async fn ungueltige_eingabe_wird_nicht_gespeichert() {
    let store = InMemoryStore::neu();
    let mut r = neue("Ada", "1");
    r.reservation_date = "naechsten Dienstag".into();

    let e = store.create(r).await.unwrap_err();
    assert!(matches!(e, StoreError::UngueltigeDaten(_)));
    assert_eq!(store.anzahl(), 0);
}

#[tokio::test]
async fn suche_nach_telefon_und_name() {
    let store = InMemoryStore::neu();
    store.create(neue("Ada Lovelace", "+44 20 7946 0000")).await.unwrap();
    store.create(neue("Alan Turing", "+44 20 7946 1111")).await.unwrap();

    let per_telefon = store
        .find(ReservierungsSuche {
            phone: Some("4420 7946 1111".into()),
            name: None,
        })
        .await
        .unwrap();
    assert_eq!(per_telefon.len(), 1);
    assert_eq!(per_telefon[0].name, "Alan Turing");

    let per_name = store
        .find(ReservierungsSuche {
            phone: None,
            name: Some("lovelace".into()),
        })
        .await
        .unwrap();
    assert_eq!(per_name.len(), 1);
}

#[tokio::test]
async fn suche_ohne_kriterien_abgelehnt() {
    let store = InMemoryStore::neu();
    let e = store.find(ReservierungsSuche::default()).await.unwrap_err();
    assert!(matches!(e, StoreError::UngueltigeDaten(_)));
}

#[tokio::test]
async fn aendern_uebernimmt_nur_gesetzte_felder() {
    let store = InMemoryStore::neu();
    let r = store.create(neue("Ada", "1")).await.unwrap();

    let geaendert = store
        .modify(
            r.row_id,
            ReservierungsAenderung {
                guests_count: Some(6),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(geaendert.guests_count, 6);
    assert_eq!(geaendert.name, "Ada");
    assert_eq!(geaendert.reservation_date, r.reservation_date);
}

#[tokio::test]
async fn aendern_mit_ungueltigem_wert_laesst_zeile_unveraendert() {
    let store = InMemoryStore::neu();
    let r = store.create(neue("Ada", "1")).await.unwrap();

    let e = store
        .modify(
            r.row_id,
            ReservierungsAenderung {
                guests_count: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(e, StoreError::UngueltigeDaten(_)));
    assert_eq!(store.laden(r.row_id).unwrap().guests_count, 2);
}

#[tokio::test]
async fn stornieren_und_doppelt_stornieren() {
    let store = InMemoryStore::neu();
    let r = store.create(neue("Ada", "1")).await.unwrap();

    let storniert = store.cancel(r.row_id).await.unwrap();
    assert_eq!(storniert.status, ReservierungsStatus::Storniert);

    let e = store.cancel(r.row_id).await.unwrap_err();
    assert!(matches!(e, StoreError::BereitsStorniert(_)));

    // Stornierte Zeilen tauchen in der Suche nicht mehr auf
    let treffer = store
        .find(ReservierungsSuche {
            phone: Some("1".into()),
            name: None,
        })
        .await
        .unwrap();
    assert!(treffer.is_empty());
}

#[tokio::test]
async fn unbekannte_zeile() {
    let store = InMemoryStore::neu();
    let e = store.cancel(RowId(99)).await.unwrap_err();
    assert!(matches!(e, StoreError::NichtGefunden(RowId(99))));
}
