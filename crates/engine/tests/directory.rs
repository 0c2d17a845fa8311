mod common;

use engine::{
    AddressOwner, CompanyListFilter, CompanyPatch, EngineError, MemberRole, NewAddress,
    NewCompany, NewUser, Role, UserListFilter, UserPatch,
};
use uuid::Uuid;

use common::{engine_with_db, insert_company, insert_user, link};

#[tokio::test]
async fn company_crud_is_master_only() {
    let (engine, db) = engine_with_db().await;
    let root = insert_user(&db, "Root", Role::AdminMaster).await;
    let admin = insert_user(&db, "Alice", Role::CompanyAdmin).await;
    let master = engine.load_actor(root).await.unwrap();
    let actor = engine.load_actor(admin).await.unwrap();

    let err = engine
        .create_company(&actor, NewCompany::new("Acme", "11.111.111/0001-11"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .create_company(&master, NewCompany::new("   ", "11.111.111/0001-11"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let company = engine
        .create_company(&master, NewCompany::new(" Acme ", "12.345.678/0001-90"))
        .await
        .unwrap();
    assert_eq!(company.name, "Acme");

    let updated = engine
        .update_company(
            &master,
            company.id,
            CompanyPatch {
                name: Some("Acme Ltda".to_string()),
                ..CompanyPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Acme Ltda");
    assert_eq!(updated.cnpj, "12.345.678/0001-90");

    engine.delete_company(&master, company.id).await.unwrap();
    let err = engine.show_company(&master, company.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn companies_are_listed_by_membership() {
    let (engine, db) = engine_with_db().await;
    let root = insert_user(&db, "Root", Role::AdminMaster).await;
    let worker = insert_user(&db, "Bob", Role::CompanyUser).await;
    let c1 = insert_company(&db, "Acme").await;
    let c2 = insert_company(&db, "Globex").await;
    link(&db, c1, worker).await;
    let master = engine.load_actor(root).await.unwrap();
    let actor = engine.load_actor(worker).await.unwrap();

    let all = engine
        .list_companies(&master, &CompanyListFilter::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    let mine = engine
        .list_companies(&actor, &CompanyListFilter::default())
        .await
        .unwrap();
    assert_eq!(mine.items.len(), 1);
    assert_eq!(mine.items[0].id, c1);

    let search = CompanyListFilter {
        search: Some("Glob".to_string()),
        ..CompanyListFilter::default()
    };
    assert_eq!(engine.list_companies(&master, &search).await.unwrap().total, 1);

    assert!(engine.show_company(&actor, c1).await.is_ok());
    let err = engine.show_company(&actor, c2).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    // Non-members learn nothing about which ids exist.
    let err = engine.show_company(&actor, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = engine.show_company(&master, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn cnpj_is_required_and_unique() {
    let (engine, db) = engine_with_db().await;
    let root = insert_user(&db, "Root", Role::AdminMaster).await;
    let master = engine.load_actor(root).await.unwrap();

    let err = engine
        .create_company(&master, NewCompany::new("Blank", "  "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let acme = engine
        .create_company(&master, NewCompany::new("Acme", "12.345.678/0001-90"))
        .await
        .unwrap();
    let globex = engine
        .create_company(&master, NewCompany::new("Globex", "98.765.432/0001-10"))
        .await
        .unwrap();

    let err = engine
        .create_company(&master, NewCompany::new("Acme Clone", " 12.345.678/0001-90 "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .update_company(
            &master,
            globex.id,
            CompanyPatch {
                cnpj: Some("12.345.678/0001-90".to_string()),
                ..CompanyPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // Keeping its own cnpj is not a conflict.
    let same = engine
        .update_company(
            &master,
            acme.id,
            CompanyPatch {
                cnpj: Some("12.345.678/0001-90".to_string()),
                ..CompanyPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same.cnpj, "12.345.678/0001-90");

    // A deleted company still holds its cnpj.
    engine.delete_company(&master, acme.id).await.unwrap();
    let err = engine
        .create_company(&master, NewCompany::new("Acme II", "12.345.678/0001-90"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn search_matches_wildcards_literally() {
    let (engine, db) = engine_with_db().await;
    let root = insert_user(&db, "Root", Role::AdminMaster).await;
    insert_company(&db, "Acme").await;
    insert_company(&db, "100% Natural").await;
    let master = engine.load_actor(root).await.unwrap();

    for (needle, expected) in [("%", 1), ("_", 0), ("cm", 1)] {
        let filter = CompanyListFilter {
            search: Some(needle.to_string()),
            ..CompanyListFilter::default()
        };
        let total = engine.list_companies(&master, &filter).await.unwrap().total;
        assert_eq!(total, expected, "{needle}");
    }

    let users = UserListFilter {
        search: Some("_".to_string()),
        ..UserListFilter::default()
    };
    assert_eq!(engine.list_users(&master, &users).await.unwrap().total, 0);
}

#[tokio::test]
async fn company_admin_assigns_only_company_levels() {
    let (engine, db) = engine_with_db().await;
    let admin = insert_user(&db, "Carol", Role::CompanyAdmin).await;
    let c1 = insert_company(&db, "Acme").await;
    let c2 = insert_company(&db, "Globex").await;
    link(&db, c1, admin).await;
    let actor = engine.load_actor(admin).await.unwrap();

    for role in [Role::AdminMaster, Role::User] {
        let err = engine
            .create_user(&actor, NewUser::new("X", "x@example.com", role))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)), "{role}");
    }

    let err = engine
        .create_user(
            &actor,
            NewUser::new("X", "x@example.com", Role::CompanyUser).company(c2, MemberRole::Employee),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let user = engine
        .create_user(
            &actor,
            NewUser::new("Dana", "Dana@Example.com", Role::CompanyUser)
                .company(c1, MemberRole::Manager)
                .position("Accountant"),
        )
        .await
        .unwrap();
    assert_eq!(user.email, "dana@example.com");
    assert_eq!(user.role, Some(Role::CompanyUser));

    let loaded = engine.load_actor(user.id).await.unwrap();
    assert!(loaded.belongs_to(c1));

    let members = engine.list_members(&actor, c1).await.unwrap();
    let (membership, _) = members
        .iter()
        .find(|(_, u)| u.id == user.id)
        .unwrap();
    assert_eq!(membership.role, MemberRole::Manager);
    assert_eq!(membership.position.as_deref(), Some("Accountant"));
}

#[tokio::test]
async fn create_user_is_atomic() {
    let (engine, db) = engine_with_db().await;
    let root = insert_user(&db, "Root", Role::AdminMaster).await;
    let master = engine.load_actor(root).await.unwrap();

    let err = engine
        .create_user(
            &master,
            NewUser::new("Eve", "eve@example.com", Role::User)
                .company(Uuid::new_v4(), MemberRole::Employee),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    // Nothing was left behind, so the email is still free.
    let user = engine
        .create_user(&master, NewUser::new("Eve", "eve@example.com", Role::User))
        .await
        .unwrap();
    let err = engine
        .create_user(&master, NewUser::new("Eve 2", "EVE@example.com", Role::User))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
    assert_eq!(user.name, "Eve");
}

#[tokio::test]
async fn user_can_be_created_with_a_new_company() {
    let (engine, db) = engine_with_db().await;
    let root = insert_user(&db, "Root", Role::AdminMaster).await;
    let admin = insert_user(&db, "Alice", Role::CompanyAdmin).await;
    let existing = insert_company(&db, "Acme").await;
    link(&db, existing, admin).await;
    let master = engine.load_actor(root).await.unwrap();
    let actor = engine.load_actor(admin).await.unwrap();

    let err = engine
        .create_user(
            &actor,
            NewUser::new("X", "x@example.com", Role::CompanyUser)
                .new_company(NewCompany::new("Side", "22.222.222/0001-22"), MemberRole::Owner),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let mut both = NewUser::new("X", "x@example.com", Role::CompanyUser)
        .new_company(NewCompany::new("Side", "22.222.222/0001-22"), MemberRole::Owner);
    both.company_id = Some(existing);
    let err = engine.create_user(&master, both).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let user = engine
        .create_user(
            &master,
            NewUser::new("Owen", "owen@example.com", Role::CompanyAdmin)
                .new_company(NewCompany::new("Initech", "33.333.333/0001-33"), MemberRole::Owner),
        )
        .await
        .unwrap();
    let owner = engine.load_actor(user.id).await.unwrap();
    let mine = engine
        .list_companies(&owner, &CompanyListFilter::default())
        .await
        .unwrap();
    assert_eq!(mine.items.len(), 1);
    assert_eq!(mine.items[0].name, "Initech");
    let members = engine.list_members(&owner, mine.items[0].id).await.unwrap();
    assert_eq!(members[0].0.role, MemberRole::Owner);

    // A cnpj clash rolls the user back too.
    let err = engine
        .create_user(
            &master,
            NewUser::new("Pia", "pia@example.com", Role::CompanyAdmin)
                .new_company(NewCompany::new("Initech 2", "33.333.333/0001-33"), MemberRole::Owner),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
    let search = UserListFilter {
        search: Some("pia@".to_string()),
        include_trashed: true,
        ..UserListFilter::default()
    };
    assert_eq!(engine.list_users(&master, &search).await.unwrap().total, 0);
}

#[tokio::test]
async fn addresses_follow_owner_permissions() {
    let (engine, db) = engine_with_db().await;
    let admin = insert_user(&db, "Bea", Role::CompanyAdmin).await;
    let worker = insert_user(&db, "Cid", Role::CompanyUser).await;
    let outsider = insert_user(&db, "Dov", Role::User).await;
    let company = insert_company(&db, "Acme").await;
    link(&db, company, admin).await;
    link(&db, company, worker).await;
    let admin = engine.load_actor(admin).await.unwrap();
    let worker = engine.load_actor(worker).await.unwrap();
    let outsider = engine.load_actor(outsider).await.unwrap();
    let owner = AddressOwner::Company(company);

    let err = engine.show_address(&worker, owner).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let cmd = NewAddress::new("Rua A", "Campinas", "sp", "13000-000").number("12");
    let err = engine
        .put_address(&worker, owner, cmd.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let created = engine.put_address(&admin, owner, cmd).await.unwrap();
    assert_eq!(created.state, "SP");
    assert_eq!(created.country, "Brasil");

    let moved = engine
        .put_address(
            &admin,
            owner,
            NewAddress::new("Rua B", "Campinas", "SP", "13000-001").country("Brazil"),
        )
        .await
        .unwrap();
    assert_eq!(moved.id, created.id);
    assert_eq!(moved.street, "Rua B");
    assert!(moved.number.is_none());
    let shown = engine.show_address(&worker, owner).await.unwrap();
    assert_eq!((shown.id, shown.country.as_str()), (moved.id, "Brazil"));

    let err = engine.show_address(&outsider, owner).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = engine
        .put_address(&admin, owner, NewAddress::new("Rua C", "X", "S1", "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let personal = AddressOwner::User(outsider.id);
    engine
        .put_address(&outsider, personal, NewAddress::new("Rua D", "Recife", "PE", "50000-000"))
        .await
        .unwrap();
    let err = engine.show_address(&admin, personal).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.delete_address(&admin, owner).await.unwrap();
    let err = engine.show_address(&admin, owner).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine.delete_address(&admin, owner).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn user_visibility_follows_shared_companies() {
    let (engine, db) = engine_with_db().await;
    let admin = insert_user(&db, "Fay", Role::CompanyAdmin).await;
    let colleague = insert_user(&db, "Gus", Role::CompanyUser).await;
    let stranger = insert_user(&db, "Hal", Role::CompanyUser).await;
    let c1 = insert_company(&db, "Acme").await;
    let c2 = insert_company(&db, "Globex").await;
    link(&db, c1, admin).await;
    link(&db, c1, colleague).await;
    link(&db, c2, stranger).await;
    let actor = engine.load_actor(admin).await.unwrap();

    let page = engine
        .list_users(&actor, &UserListFilter::default())
        .await
        .unwrap();
    let names: Vec<&str> = page.items.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Fay", "Gus"]);

    assert!(engine.show_user(&actor, colleague).await.is_ok());
    let err = engine.show_user(&actor, stranger).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let foreign = UserListFilter {
        company_id: Some(c2),
        ..UserListFilter::default()
    };
    assert!(engine.list_users(&actor, &foreign).await.unwrap().items.is_empty());

    let worker = engine.load_actor(colleague).await.unwrap();
    let err = engine
        .list_users(&worker, &UserListFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    assert!(engine.show_user(&worker, colleague).await.is_ok());
}

#[tokio::test]
async fn users_update_themselves_but_not_their_role() {
    let (engine, db) = engine_with_db().await;
    let me = insert_user(&db, "Ian", Role::User).await;
    let actor = engine.load_actor(me).await.unwrap();

    let updated = engine
        .update_user(
            &actor,
            me,
            UserPatch {
                name: Some("Ian M.".to_string()),
                phone: Some("+55 11 99999-0000".to_string()),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Ian M.");

    let err = engine
        .update_user(
            &actor,
            me,
            UserPatch {
                role: Some(Role::AdminMaster),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn delete_and_restore_users() {
    let (engine, db) = engine_with_db().await;
    let root = insert_user(&db, "Root", Role::AdminMaster).await;
    let target = insert_user(&db, "Jo", Role::User).await;
    let master = engine.load_actor(root).await.unwrap();

    let err = engine.delete_user(&master, root).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.delete_user(&master, target).await.unwrap();
    let err = engine.load_actor(target).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let trashed = UserListFilter {
        include_trashed: true,
        ..UserListFilter::default()
    };
    assert_eq!(engine.list_users(&master, &trashed).await.unwrap().total, 2);
    assert_eq!(
        engine
            .list_users(&master, &UserListFilter::default())
            .await
            .unwrap()
            .total,
        1
    );

    let restored = engine.restore_user(&master, target).await.unwrap();
    assert!(restored.deleted_at.is_none());
    assert!(engine.load_actor(target).await.is_ok());
}

#[tokio::test]
async fn memberships_are_managed_by_company_admins() {
    let (engine, db) = engine_with_db().await;
    let admin = insert_user(&db, "Kim", Role::CompanyAdmin).await;
    let newcomer = insert_user(&db, "Lou", Role::CompanyUser).await;
    let c1 = insert_company(&db, "Acme").await;
    let c2 = insert_company(&db, "Globex").await;
    link(&db, c1, admin).await;
    let actor = engine.load_actor(admin).await.unwrap();

    let err = engine
        .add_member(&actor, c2, newcomer, MemberRole::Employee, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .add_member(&actor, c1, newcomer, MemberRole::Employee, Some("Clerk"))
        .await
        .unwrap();
    let err = engine
        .add_member(&actor, c1, newcomer, MemberRole::Owner, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
    assert_eq!(
        engine.companies_of(newcomer).await.unwrap().into_iter().collect::<Vec<_>>(),
        vec![c1]
    );

    engine.remove_member(&actor, c1, newcomer).await.unwrap();
    assert!(engine.companies_of(newcomer).await.unwrap().is_empty());

    // A removed link can be added again.
    let membership = engine
        .add_member(&actor, c1, newcomer, MemberRole::Owner, None)
        .await
        .unwrap();
    assert_eq!(membership.role, MemberRole::Owner);
}
