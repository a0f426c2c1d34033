pub mod core;
pub mod index;
pub mod storage;
pub mod parallel;
pub mod query;
pub mod api;
pub mod server;

/*
┌──────────────────────────────────────────────────────────────────────────────────────┐
│                              TRAVELBASE ARCHITECTURE                                  │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── SERVER LAYER ────────────────────────────────────┐
│                                                                                      │
│   reactor pair × N (one per core)                                                    │
│  ┌───────────────────────────────┐        ┌──────────────────────────────────────┐  │
│  │ AcceptLoop                    │ handoff│ ConnectionLoop                       │  │
│  │ • listener: SO_REUSEPORT      │───────▶│ • poller: Epoll (ET + ONESHOT)       │  │
│  │ • poller: Epoll (ET+EXCLUSIVE)│  chan  │ • connections: HashMap<Token, Conn>  │  │
│  └───────────────────────────────┘        │ • deadline sweep every poll_tick     │  │
│                                           └──────────────────┬───────────────────┘  │
│   Connection: Reading ──parse──▶ dispatch ──▶ Responding ──▶ closed                  │
└──────────────────────────────────────────────────────────────┼───────────────────────┘
                                                               │ Request<'_>
┌──────────────────────────────────── API LAYER ───────────────▼───────────────────────┐
│  Router (ordered route table) ──▶ Api handlers ──▶ payload / params validation        │
└───────────────────────┬──────────────────────────────────────┬───────────────────────┘
                        │ writes / point reads                 │ AverageMark / VisitedPlaces
┌───────────────────────▼──────────────┐      ┌────────────────▼──────────────────────┐
│ Store                                │◀─────│ QueryEngine                            │
│ • users / locations / visits         │      │ • Filter + AgeWindow                   │
│     SnapshotIndex (id → ArcSwap JSON)│      │ • ReferenceTime                        │
│ • visits_by_user / _by_location      │      └────────────────────────────────────────┘
│     MembershipIndex (id → Arc<Vec>)  │
│ • emails: EmailSet                   │◀─────┐
│ • one writer Mutex per entity kind   │      │ load_* (startup only)
└──────────────────────────────────────┘      │
                                  ┌───────────┴──────────────────────────────────────┐
                                  │ BulkLoader: Bundle ──bounded chan──▶ W workers     │
                                  └──────────────────────────────────────────────────┘
*/
