//! Demo data for local development.
//!
//! Idempotent: rows carry fixed ids (users are matched by email), so a
//! second run creates no duplicates.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use fp_auth::{hash_password, DEFAULT_COST};
use fp_schemas::{EventStatus, OrderStatus, Role};

use crate::ads::{insert_order_with, insert_product_with_id, NewOrder, NewProduct};
use crate::catalog::{
    insert_celeb_with_id, insert_event_with, insert_place_with_id, NewCeleb, NewEvent, NewPlace,
};
use crate::users::{fetch_user_by_email, insert_user, NewUser};

const fn seed_id(n: u128) -> Uuid {
    Uuid::from_u128(0x5eed0000_0000_4000_8000_000000000000 | n)
}

const CELEBS: [Uuid; 3] = [seed_id(0x101), seed_id(0x102), seed_id(0x103)];
const PLACES: [Uuid; 3] = [seed_id(0x201), seed_id(0x202), seed_id(0x203)];
const EVENTS: [Uuid; 3] = [seed_id(0x301), seed_id(0x302), seed_id(0x303)];
const PRODUCTS: [Uuid; 3] = [seed_id(0x401), seed_id(0x402), seed_id(0x403)];
const SAMPLE_ORDER: Uuid = seed_id(0x501);
const SAMPLE_REVIEW: Uuid = seed_id(0x601);
const SAMPLE_POSTING: Uuid = seed_id(0x701);
const SAMPLE_PROOF: Uuid = seed_id(0x801);

/// Demo accounts: (email, password, name, role).
pub const SEED_USERS: [(&str, &str, &str, Role); 4] = [
    ("admin@fanplace.local", "admin123", "Admin User", Role::Admin),
    ("fan@fanplace.local", "fan123", "팬 유저", Role::Fan),
    ("promoter@fanplace.local", "promoter123", "주최자 유저", Role::Promoter),
    ("advertiser@fanplace.local", "advertiser123", "광고주 유저", Role::Advertiser),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub celebs: usize,
    pub places: usize,
    pub events: usize,
    pub products: usize,
    pub orders: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn some(s: &str) -> Option<String> {
    Some(s.to_string())
}

/// Existing users keep their password; only missing ones are created.
async fn ensure_user(pool: &PgPool, email: &str, password: &str, name: &str, role: Role) -> Result<Uuid> {
    if let Some(existing) = fetch_user_by_email(pool, email).await? {
        return Ok(existing.user.id);
    }

    let plain = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&plain, DEFAULT_COST))
        .await
        .context("seed password hash task failed")??;

    let user = insert_user(
        pool,
        &NewUser {
            email: email.to_string(),
            password_hash,
            name: some(name),
            role,
        },
    )
    .await?;
    Ok(user.id)
}

pub async fn seed(pool: &PgPool) -> Result<SeedReport> {
    let now = Utc::now();
    let mut report = SeedReport::default();

    let mut user_ids = Vec::with_capacity(SEED_USERS.len());
    for (email, password, name, role) in SEED_USERS {
        user_ids.push(ensure_user(pool, email, password, name, role).await?);
        report.users += 1;
    }
    let promoter = user_ids[2];
    let advertiser = user_ids[3];

    for (id, celeb) in CELEBS.iter().zip(seed_celebs()) {
        insert_celeb_with_id(pool, *id, &celeb).await?;
        report.celebs += 1;
    }

    for (id, place) in PLACES.iter().zip(seed_places()) {
        insert_place_with_id(pool, *id, &place).await?;
        report.places += 1;
    }

    for (id, event) in EVENTS.iter().zip(seed_events(now, promoter)) {
        insert_event_with(pool, *id, &event, EventStatus::Published).await?;
        report.events += 1;
    }

    let mut subway_price = 0;
    for (id, product) in PRODUCTS.iter().zip(seed_products()) {
        let p = insert_product_with_id(pool, *id, &product).await?;
        if *id == PRODUCTS[0] {
            subway_price = p.price_krw;
        }
        report.products += 1;
    }

    seed_sample_order(pool, now, advertiser, subway_price).await?;
    report.orders += 1;

    info!(?report, "seed complete");
    Ok(report)
}

/// A PAID subway order with its approved review, posting and one proof.
async fn seed_sample_order(
    pool: &PgPool,
    now: DateTime<Utc>,
    advertiser: Uuid,
    amount: i64,
) -> Result<()> {
    insert_order_with(
        pool,
        SAMPLE_ORDER,
        &NewOrder {
            product_id: PRODUCTS[0],
            user_id: advertiser,
            amount,
            currency: "KRW".to_string(),
            payment_provider: "stripe".to_string(),
            addons: None,
        },
        OrderStatus::Paid,
    )
    .await?;

    sqlx::query(
        "update orders set payment_intent_id = $2 where id = $1 and payment_intent_id is null",
    )
    .bind(SAMPLE_ORDER)
    .bind("pi_test_sample123")
    .execute(pool)
    .await
    .context("seed order payment intent failed")?;

    let start = now + Duration::days(2);
    sqlx::query(
        r#"
        insert into ad_reviews (id, order_id, status, design_urls, copy_text, target_date, reviewed_at)
        values ($1, $2, 'APPROVED', $3, $4, $5, $6)
        on conflict do nothing
        "#,
    )
    .bind(SAMPLE_REVIEW)
    .bind(SAMPLE_ORDER)
    .bind(strings(&[
        "https://images.unsplash.com/photo-1626785774573-4b799315345d?w=800&h=600&fit=crop",
    ]))
    .bind("사랑해요 지민! 생일 축하해요 🎉")
    .bind(start)
    .bind(now)
    .execute(pool)
    .await
    .context("seed review failed")?;

    sqlx::query(
        r#"
        insert into ad_postings (id, order_id, start_date, end_date, locations)
        values ($1, $2, $3, $4, $5)
        on conflict do nothing
        "#,
    )
    .bind(SAMPLE_POSTING)
    .bind(SAMPLE_ORDER)
    .bind(start)
    .bind(now + Duration::days(32))
    .bind(strings(&["강남역 2호선 1-4", "강남역 2호선 1-5"]))
    .execute(pool)
    .await
    .context("seed posting failed")?;

    sqlx::query(
        r#"
        insert into ad_proofs (id, posting_id, image_url, location, taken_at)
        values ($1, $2, $3, $4, $5)
        on conflict do nothing
        "#,
    )
    .bind(SAMPLE_PROOF)
    .bind(SAMPLE_POSTING)
    .bind("https://images.unsplash.com/photo-1531482615713-2afd69097998?w=800&h=600&fit=crop")
    .bind("강남역 2호선 1-4")
    .bind(now)
    .execute(pool)
    .await
    .context("seed proof failed")?;

    Ok(())
}

fn seed_celebs() -> Vec<NewCeleb> {
    vec![
        NewCeleb {
            name: "아이유".to_string(),
            name_en: some("IU"),
            name_ja: some("アイユー"),
            name_zh: some("IU"),
            image_url: some("https://images.unsplash.com/photo-1494790108377-be9c29b29330?w=400&h=600&fit=crop"),
            group_name: some("Solo"),
            birth_date: NaiveDate::from_ymd_opt(1993, 5, 16),
        },
        NewCeleb {
            name: "지민".to_string(),
            name_en: some("Jimin"),
            name_ja: some("ジミン"),
            name_zh: some("智旻"),
            image_url: some("https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=400&h=600&fit=crop"),
            group_name: some("BTS"),
            birth_date: NaiveDate::from_ymd_opt(1995, 10, 13),
        },
        NewCeleb {
            name: "윈터".to_string(),
            name_en: some("Winter"),
            name_ja: some("ウィンター"),
            name_zh: some("Winter"),
            image_url: some("https://images.unsplash.com/photo-1438761681033-6461ffad8d80?w=400&h=600&fit=crop"),
            group_name: some("aespa"),
            birth_date: NaiveDate::from_ymd_opt(2001, 1, 1),
        },
    ]
}

fn seed_places() -> Vec<NewPlace> {
    vec![
        NewPlace {
            name: "카페 덕후".to_string(),
            name_en: some("Cafe Deokhu"),
            address: some("서울특별시 강남구 테헤란로 123"),
            region: some("강남"),
            description: some("팬 이벤트에 최적화된 카페입니다. 넓은 공간과 완벽한 인테리어를 제공합니다."),
            image_urls: strings(&[
                "https://images.unsplash.com/photo-1554118811-1e0d58224f24?w=800&h=600&fit=crop",
                "https://images.unsplash.com/photo-1559925393-8be0ec4767c8?w=800&h=600&fit=crop",
            ]),
            latitude: Some(37.5012),
            longitude: Some(127.0396),
            rental_available: true,
            rental_rules: some("최소 3일 전 예약 필수. 장식 설치 가능. 음료 및 디저트 제공."),
            capacity: Some(50),
            price_range: some("₩500,000 - ₩1,000,000"),
        },
        NewPlace {
            name: "홍대 팬스페이스".to_string(),
            name_en: some("Hongdae Fan Space"),
            address: some("서울특별시 마포구 홍익로 456"),
            region: some("홍대"),
            description: some("젊은 팬들이 모이는 핫플레이스. 포토존과 굿즈 판매 공간 완비."),
            image_urls: strings(&[
                "https://images.unsplash.com/photo-1511081692775-05d0f180a065?w=800&h=600&fit=crop",
            ]),
            latitude: Some(37.5563),
            longitude: Some(126.9239),
            rental_available: true,
            rental_rules: some("주말 예약 우선. 음향 시설 제공."),
            capacity: Some(30),
            price_range: some("₩300,000 - ₩700,000"),
        },
        NewPlace {
            name: "명동 K-POP 카페".to_string(),
            name_en: some("Myeongdong K-POP Cafe"),
            address: some("서울특별시 중구 명동길 789"),
            region: some("명동"),
            description: some("외국인 팬들도 많이 찾는 관광 명소. 접근성이 뛰어납니다."),
            image_urls: strings(&[
                "https://images.unsplash.com/photo-1501339847302-ac426a4a7cbb?w=800&h=600&fit=crop",
            ]),
            latitude: Some(37.5636),
            longitude: Some(126.9834),
            rental_available: true,
            rental_rules: None,
            capacity: Some(40),
            price_range: some("₩400,000 - ₩900,000"),
        },
    ]
}

fn seed_events(now: DateTime<Utc>, owner: Uuid) -> Vec<NewEvent> {
    let at = |start_days: i64, len_days: i64| {
        let start = now + Duration::days(start_days);
        (start, start + Duration::days(len_days))
    };
    let (s1, e1) = at(7, 3);
    let (s2, e2) = at(14, 5);
    let (s3, e3) = at(21, 4);

    vec![
        NewEvent {
            title: "아이유 생일 카페 ☕️🎂".to_string(),
            title_en: some("IU Birthday Cafe"),
            description: some("아이유 생일을 축하하는 특별한 카페 이벤트입니다. 포토카드, 컵홀더, 특제 음료 제공!"),
            image_url: some("https://images.unsplash.com/photo-1514933651103-005eec06c04b?w=800&h=1200&fit=crop"),
            start_date: s1,
            end_date: e1,
            perks: strings(&["포토카드 3종", "컵홀더", "특제 음료", "포토존"]),
            celeb_id: CELEBS[0],
            place_id: Some(PLACES[0]),
            user_id: owner,
        },
        NewEvent {
            title: "지민 생일 기념 전시회 🎨".to_string(),
            title_en: some("Jimin Birthday Exhibition"),
            description: some("지민의 생일을 기념하는 팬아트 전시와 함께하는 특별한 이벤트!"),
            image_url: some("https://images.unsplash.com/photo-1506794778202-cad84cf45f1d?w=800&h=1200&fit=crop"),
            start_date: s2,
            end_date: e2,
            perks: strings(&["한정판 포스터", "엽서 세트", "스티커", "포토북"]),
            celeb_id: CELEBS[1],
            place_id: Some(PLACES[1]),
            user_id: owner,
        },
        NewEvent {
            title: "Winter 응원 카페 ❄️".to_string(),
            title_en: some("Winter Support Cafe"),
            description: some("윈터를 응원하는 팬들의 모임. 따뜻한 음료와 함께 즐기는 팬 이벤트!"),
            image_url: some("https://images.unsplash.com/photo-1534528741775-53994a69daeb?w=800&h=1200&fit=crop"),
            start_date: s3,
            end_date: e3,
            perks: strings(&["포토카드", "키링", "머그컵", "포토존 이용권"]),
            celeb_id: CELEBS[2],
            place_id: Some(PLACES[2]),
            user_id: owner,
        },
    ]
}

fn seed_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            title: "지하철 스크린도어 광고 (1개월)".to_string(),
            title_en: some("Subway Screen Door Ad (1 Month)"),
            description: some("강남역 2호선 스크린도어 광고. 하루 평균 10만명 노출."),
            price_krw: 2_000_000,
            term_months: 1,
            features: strings(&[
                "강남역 2호선 (10개 위치)",
                "하루 평균 10만명 노출",
                "디자인 검수 포함",
                "설치 및 철거 서비스",
                "현장 인증 사진 제공",
            ]),
            placement: strings(&["subway"]),
            image_url: some("https://images.unsplash.com/photo-1544620347-c4fd4a3d5957?w=800&h=600&fit=crop"),
        },
        NewProduct {
            title: "버스 랩핑 광고 (3개월)".to_string(),
            title_en: some("Bus Wrapping Ad (3 Months)"),
            description: some("서울 시내버스 전면 랩핑. 이동하는 광고판으로 최대 노출 효과."),
            price_krw: 5_000_000,
            term_months: 3,
            features: strings(&[
                "시내버스 5대 (강남/홍대 노선)",
                "3개월 장기 집행",
                "전면 랩핑 (양면)",
                "디자인 제작 지원",
                "월별 노출 리포트",
            ]),
            placement: strings(&["bus"]),
            image_url: some("https://images.unsplash.com/photo-1570125909232-eb263c188f7e?w=800&h=600&fit=crop"),
        },
        NewProduct {
            title: "디지털 빌보드 (6개월)".to_string(),
            title_en: some("Digital Billboard (6 Months)"),
            description: some("타임스퀘어 디지털 빌보드. 프리미엄 위치의 압도적 노출."),
            price_krw: 15_000_000,
            term_months: 6,
            features: strings(&[
                "타임스퀘어 메인 빌보드",
                "15초 영상 광고 (시간당 6회 노출)",
                "6개월 장기 계약",
                "영상 제작 컨설팅",
                "실시간 노출 모니터링",
            ]),
            placement: strings(&["billboard", "digital"]),
            image_url: some("https://images.unsplash.com/photo-1541534741688-6078c6bfb5c5?w=800&h=600&fit=crop"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_ids_are_distinct() {
        let all: Vec<Uuid> = CELEBS
            .iter()
            .chain(PLACES.iter())
            .chain(EVENTS.iter())
            .chain(PRODUCTS.iter())
            .chain([SAMPLE_ORDER, SAMPLE_REVIEW, SAMPLE_POSTING, SAMPLE_PROOF].iter())
            .copied()
            .collect();
        let unique: HashSet<Uuid> = all.iter().copied().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn seed_events_are_future_and_well_formed() {
        let now = Utc::now();
        for e in seed_events(now, Uuid::nil()) {
            assert!(e.start_date > now);
            assert!(e.end_date > e.start_date);
        }
    }

    #[test]
    fn only_one_seed_admin() {
        let admins = SEED_USERS.iter().filter(|u| u.3 == Role::Admin).count();
        assert_eq!(admins, 1);
    }
}
